// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::common::Template;

use anyhow::Result;
use tmplshape::ast::ExprRef;
use tmplshape::*;

fn bind(m: &Macro, args: &[ExprRef], kwargs: &[Keyword<ExprRef>]) -> tmplshape::Result<Binding> {
    bind_with(&Config::default(), m, args, kwargs)
}

fn bind_with(
    config: &Config,
    m: &Macro,
    args: &[ExprRef],
    kwargs: &[Keyword<ExprRef>],
) -> tmplshape::Result<Binding> {
    MacroCall::new(m, args, kwargs, &StructureVisitor, config)?.bind()
}

fn failing_param(err: &Error) -> Option<&str> {
    match err {
        Error::Argument { param, .. } => Some(&**param),
        _ => None,
    }
}

#[test]
fn scalar_argument_to_unconstrained_parameter() -> Result<()> {
    let t = Template::new("{{ show(title|upper) }}")?;
    let arg = t.filter("title|upper", t.name("title", 0)?, "upper")?;

    let m = Macro::new("show").positional("x", Type::unknown());
    let binding = bind(&m, &[arg], &[])?;

    assert_eq!(binding.structure.to_string(), "dict{title: string}");
    let title = binding.structure.get("title").unwrap();
    assert!(title.is_scalar());
    assert_eq!(
        title.locations.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["template.html:1:9"]
    );
    assert!(binding.is_exact());
    Ok(())
}

#[test]
fn positional_argument_spills_into_keyword_parameter() -> Result<()> {
    let t = Template::new("{{ card(item) }}")?;
    let m = Macro::new("card").keyword("y", Type::field("id", Type::scalar()));
    let binding = bind(&m, &[t.name("item", 0)?], &[])?;

    assert_eq!(binding.structure.to_string(), "dict{item: dict{id: scalar}}");
    assert!(binding.unfilled.is_empty());
    Ok(())
}

#[test]
fn attribute_argument_gets_declared_shape() -> Result<()> {
    let t = Template::new("{{ card(order.customer) }}")?;
    let arg = t.attr("order.customer", t.name("order", 0)?, "customer")?;

    let declared = Type::dictionary_from([
        ("name", Type::string()),
        ("emails", Type::list(Type::string())),
    ]);
    let m = Macro::new("card").positional("person", declared);
    let binding = bind(&m, &[arg], &[])?;

    assert_eq!(
        binding.structure.to_string(),
        "dict{order: dict{customer: dict{name: string, emails: list[string]}}}"
    );
    Ok(())
}

#[test]
fn variadic_macro_accepts_unknown_keyword() -> Result<()> {
    let t = Template::new("{{ button(label, class_=css|lower) }}")?;
    let css = t.filter("css|lower", t.name("css", 0)?, "lower")?;

    let m = Macro::new("button")
        .positional("label", Type::scalar())
        .variadic_keywords();
    let binding = bind(&m, &[t.name("label", 0)?], &[Keyword::new("class_", css)])?;

    assert_eq!(binding.structure.to_string(), "dict{label: scalar, css: string}");
    assert_eq!(binding.captured_keywords, vec![Rc::from("class_")]);
    assert!(binding.is_exact());
    Ok(())
}

#[test]
fn keyword_matched_by_name_is_not_captured_again() -> Result<()> {
    let t = Template::new("{{ button(size=n) }}")?;
    let m = Macro::new("button")
        .keyword("size", Type::number())
        .variadic_keywords();
    let binding = bind(&m, &[], &[Keyword::new("size", t.name("n", 1)?)])?;

    assert!(binding.captured_keywords.is_empty());
    assert_eq!(binding.structure.to_string(), "dict{n: number}");
    Ok(())
}

#[test]
fn two_positionals_fill_positional_then_keyword() -> Result<()> {
    let t = Template::new("{{ pair(left, right) }}")?;
    let m = Macro::new("pair")
        .positional("a", Type::string())
        .keyword("b", Type::list(Type::unknown()));
    let binding = bind(&m, &[t.name("left", 0)?, t.name("right", 0)?], &[])?;

    assert_eq!(binding.structure.to_string(), "dict{left: string, right: list[unknown]}");
    assert!(binding.unbound_positional.is_empty());
    assert!(binding.unfilled.is_empty());
    Ok(())
}

#[test]
fn keyword_for_positional_parameter() -> Result<()> {
    let t = Template::new("{{ card(user=account) }}")?;
    let m = Macro::new("card").positional("user", Type::field("id", Type::number()));
    let binding = bind(&m, &[], &[Keyword::new("user", t.name("account", 0)?)])?;

    assert_eq!(binding.structure.to_string(), "dict{account: dict{id: number}}");
    assert!(binding.is_exact());
    Ok(())
}

#[test]
fn literal_argument_against_structured_parameter() -> Result<()> {
    let t = Template::new("{{ card('bob') }}")?;
    let m = Macro::new("card").positional("user", Type::field("id", Type::scalar()));
    let err = bind(&m, &[tmplshape::ast::Expr::string(t.at("'bob'")?, "bob")], &[]).unwrap_err();

    assert!(matches!(
        err,
        Error::Argument {
            source: MergeError::ShapeConflict { .. },
            ..
        }
    ));
    assert!(err.to_string().starts_with("call to `card`: argument `user`: shape conflict"));
    Ok(())
}

#[test]
fn list_literal_argument() -> Result<()> {
    let t = Template::new("{{ table([a, b]) }}")?;
    let list = tmplshape::ast::Expr::list(
        t.at("[a, b]")?,
        vec![t.name("a", 1)?, t.name("b", 1)?],
    );
    let m = Macro::new("table").positional("rows", Type::list(Type::field("id", Type::scalar())));
    let binding = bind(&m, &[list], &[])?;

    assert_eq!(
        binding.structure.to_string(),
        "dict{a: dict{id: scalar}, b: dict{id: scalar}}"
    );
    Ok(())
}

#[test]
fn binding_twice_gives_the_same_structure() -> Result<()> {
    let t = Template::new("{{ m(x, k=y) }}")?;
    let m = Macro::new("m")
        .positional("a", Type::field("id", Type::scalar()))
        .keyword("k", Type::list(Type::scalar()))
        .variadic_keywords();
    let args = [t.name("x", 0)?];
    let kwargs = [Keyword::new("k", t.name("y", 0)?)];

    let first = bind(&m, &args, &kwargs)?;
    let second = bind(&m, &args, &kwargs)?;
    assert_eq!(first, second);
    assert_eq!(merge(&first.structure, &second.structure)?, first.structure);
    Ok(())
}

#[test]
fn nesting_limit_surfaces_from_binding() -> Result<()> {
    let t = Template::new("{{ pair(x, x) }}")?;
    let deep = (0..6).fold(Type::scalar(), |inner, i| Type::field(format!("f{i}"), inner));
    assert_eq!(deep.depth(), 7);

    let m = Macro::new("pair")
        .positional("a", deep.clone())
        .positional("b", deep);
    let config = Config {
        max_depth: 4,
        ..Config::default()
    };
    let err = bind_with(&config, &m, &[t.name("x", 0)?, t.name("x", 1)?], &[]).unwrap_err();

    assert_eq!(failing_param(&err), Some("b"));
    assert!(matches!(
        err.merge_error(),
        Some(MergeError::RecursionLimitExceeded { limit: 4 })
    ));
    Ok(())
}

#[test]
fn conflict_in_captured_keyword_names_keyword() -> Result<()> {
    let t = Template::new("{{ button(v, class_=v|upper) }}")?;
    let upper = t.filter("v|upper", t.name("v", 1)?, "upper")?;
    let m = Macro::new("button")
        .positional("item", Type::field("id", Type::scalar()))
        .variadic_keywords();

    let err = bind(&m, &[t.name("v", 0)?], &[Keyword::new("class_", upper)]).unwrap_err();
    assert_eq!(failing_param(&err), Some("class_"));
    assert!(matches!(
        err.merge_error(),
        Some(MergeError::ShapeConflict { .. })
    ));
    Ok(())
}

#[test]
fn conflict_in_leftover_arguments_names_position_or_keyword() -> Result<()> {
    let t = Template::new("{{ card(v, v|upper) }} {{ card(v, k=v|upper) }}")?;
    let m = Macro::new("card").positional("item", Type::field("id", Type::scalar()));

    let surplus = t.filter("v|upper", t.name("v", 1)?, "upper")?;
    let err = bind(&m, &[t.name("v", 0)?, surplus], &[]).unwrap_err();
    assert_eq!(failing_param(&err), Some("#2"));

    let stray = t.filter("v|upper", t.name("v", 1)?, "upper")?;
    let err = bind(&m, &[t.name("v", 0)?], &[Keyword::new("k", stray)]).unwrap_err();
    assert_eq!(failing_param(&err), Some("k"));
    assert!(err.to_string().starts_with("call to `card`: argument `k`: shape conflict"));
    Ok(())
}
