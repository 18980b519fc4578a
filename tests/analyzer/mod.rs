// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::common::Template;

use anyhow::Result;
use tmplshape::ast::{Expr, ExprRef};
use tmplshape::*;

fn analyzer(config: Config) -> TemplateAnalyzer<StructureVisitor> {
    TemplateAnalyzer::new(StructureVisitor, config)
}

fn card() -> Macro {
    Macro::new("card")
        .positional("user", Type::field("name", Type::string()))
        .keyword("tags", Type::list(Type::scalar()))
}

#[test]
fn usage_and_calls_accumulate() -> Result<()> {
    let t = Template::new("{{ page.title|upper }} {{ card(page.author, tags=labels) }}")?;
    let mut a = analyzer(Config::default());
    a.define_macro(card())?;

    let title = t.attr("page.title", t.name("page", 0)?, "title")?;
    let upper = Expr::filter(t.at("page.title|upper")?, title, "upper", vec![]);
    assert_eq!(a.record_expr(&upper)?.to_string(), "string");

    let author = t.attr("page.author", t.name("page", 1)?, "author")?;
    let contribution = a.call_macro("card", &[author], &[Keyword::new("tags", t.name("labels", 0)?)])?;
    assert_eq!(
        contribution.to_string(),
        "dict{page: dict{author: dict{name: string}}, labels: list[scalar]}"
    );

    assert_eq!(
        a.schema().to_string(),
        "dict{page: dict{title: string, author: dict{name: string}}, labels: list[scalar]}"
    );
    Ok(())
}

#[test]
fn keyword_conflicts_with_usage_elsewhere() -> Result<()> {
    let t = Template::new("{{ x.a }} {{ m(y=x) }}")?;
    let mut a = analyzer(Config::default());
    a.define_macro(Macro::new("m").keyword("y", Type::scalar()))?;

    let xa = t.attr("x.a", t.name("x", 0)?, "a")?;
    a.record_expr(&xa)?;
    let before = a.schema().clone();

    let err = a
        .call_macro("m", &[], &[Keyword::new("y", t.name("x", 1)?)])
        .unwrap_err();
    assert!(matches!(
        err.merge_error(),
        Some(MergeError::ShapeConflict { .. })
    ));
    assert_eq!(a.schema(), &before);
    Ok(())
}

#[test]
fn conflict_renders_against_template() -> Result<()> {
    let t = Template::new("{{ user.name }} {{ card(user) }}")?;
    let mut a = analyzer(Config::default());
    a.define_macro(Macro::new("card").positional("user", Type::list(Type::unknown())))?;

    let name = t.attr("user.name", t.name("user", 0)?, "name")?;
    a.record_expr(&name)?;
    let err = a.call_macro("card", &[t.name("user", 1)?], &[]).unwrap_err();

    assert!(err.to_string().contains("left seen at template.html:1:4"));
    let rendered = err.render(&t.source);
    assert!(rendered.contains("--> template.html:1:4"));
    assert!(rendered.contains("error: shape conflict"));
    Ok(())
}

#[test]
fn strict_calls_reject_bad_arity() -> Result<()> {
    let t = Template::new("{{ card() }} {{ card(a, b, c) }} {{ card(a, color=c) }}")?;
    let mut a = analyzer(Config::default());
    a.define_macro(card())?;

    let err = a.call_macro("card", &[], &[]).unwrap_err();
    assert!(matches!(err, Error::MissingArgument { ref param, .. } if &**param == "user"));

    let args = [t.name("a", 0)?, t.name("b", 0)?, t.name("c", 1)?];
    let err = a.call_macro("card", &args, &[]).unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyPositional {
            expected: 2,
            passed: 3,
            ..
        }
    ));

    let err = a
        .call_macro(
            "card",
            &[t.name("a", 1)?],
            &[Keyword::new("color", t.name("c", 2)?)],
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedKeyword { ref keyword, .. } if &**keyword == "color"));

    assert_eq!(a.schema().to_string(), "dict{}");
    Ok(())
}

#[test]
fn lenient_calls_still_record_usage() -> Result<()> {
    let t = Template::new("{{ card(a, b, c) }}")?;
    let config = Config {
        strict_calls: false,
        ..Config::default()
    };
    let mut a = analyzer(config);
    a.define_macro(card())?;

    // `card` itself contains an `a` and a `c`.
    let args: Vec<ExprRef> = vec![t.name("a", 1)?, t.name("b", 0)?, t.name("c", 1)?];
    a.call_macro("card", &args, &[])?;

    assert_eq!(
        a.schema().to_string(),
        "dict{a: dict{name: string}, b: list[scalar], c: unknown}"
    );
    Ok(())
}

#[test]
fn macros_are_defined_once() -> Result<()> {
    let mut a = analyzer(Config::default());
    a.define_macro(card())?;
    assert!(a.macro_def("card").is_some());

    let err = a.define_macro(Macro::new("card")).unwrap_err();
    assert!(matches!(err, Error::DuplicateMacro { .. }));

    let err = a.call_macro("missing", &[], &[]).unwrap_err();
    assert_eq!(err.to_string(), "macro `missing` is not defined");
    Ok(())
}

#[test]
fn duplicate_keyword_at_call_site() -> Result<()> {
    let t = Template::new("{{ card(u, tags=a, tags=b) }}")?;
    let mut a = analyzer(Config::default());
    a.define_macro(card())?;

    let kwargs = [
        Keyword::new("tags", t.name("a", 1)?),
        Keyword::new("tags", t.name("b", 0)?),
    ];
    let err = a.call_macro("card", &[t.name("u", 0)?], &kwargs).unwrap_err();
    assert!(matches!(err, Error::DuplicateKeyword { .. }));
    Ok(())
}

#[test]
#[cfg(feature = "yaml")]
fn config_from_yaml_drives_subscripts() -> Result<()> {
    let config = Config::from_yaml_str(
        "integer_index_type: tuple\nvariable_index_type: list\nstrict_calls: false\n",
    )?;
    assert!(!config.strict_calls);

    let t = Template::new("{{ pair[1] }} {{ rows[i] }}")?;
    let mut a = analyzer(config);

    let pair = Expr::getitem(
        t.at("pair[1]")?,
        t.name("pair", 0)?,
        Expr::number(t.at("1")?, 1.0),
    );
    a.record_expr(&pair)?;
    let rows = Expr::getitem(t.at("rows[i]")?, t.name("rows", 0)?, t.name("i", 0)?);
    a.record_expr(&rows)?;

    assert_eq!(
        a.schema().to_string(),
        "dict{pair: tuple(unknown, unknown), rows: list[unknown], i: scalar}"
    );

    assert!(Config::from_yaml_str("max_depth: 0").is_err());
    assert!(Config::from_yaml_str("colour: red").is_err());
    Ok(())
}

#[test]
fn schema_serializes_to_json() -> Result<()> {
    let t = Template::new("{{ user.id }}")?;
    let mut a = analyzer(Config::default());
    let id = t.attr("user.id", t.name("user", 0)?, "id")?;
    a.record_expr(&id)?;

    let json = serde_json::to_value(a.into_schema())?;
    assert_eq!(json["kind"]["dictionary"]["user"]["label"], "user");
    Ok(())
}
