//! SDL Parser
//!
//! Parses with `graphql-parser` and lowers its schema document into a
//! [`ParsedDocument`]. Only the subset used by subgraph entity schemas is
//! accepted: `type`, `interface` and `enum` definitions, no field arguments.
//! Only syntax is checked here.

use std::borrow::Cow;

use graphql_parser::schema::{self as gql, Definition, TypeDefinition, TypeExtension};
use graphql_parser::Pos;

use super::ast::{
    find_directive, Argument, DeclarationKind, Directive, EnumValue, FieldDeclaration,
    ParsedDocument, Span, TypeDeclaration, TypeRef, Value,
};
use crate::error::SyntaxError;

/// Parse SDL text into a document tree
pub fn parse(source: &str) -> Result<ParsedDocument, SyntaxError> {
    if is_blank(source) {
        return Ok(ParsedDocument::default());
    }

    let source = normalize_implements(source);
    let document = gql::parse_schema::<String>(&source).map_err(syntax_error)?;

    let declarations = document
        .definitions
        .into_iter()
        .map(lower_definition)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParsedDocument { declarations })
}

// =============================================================================
// Source Preparation
// =============================================================================

/// Only whitespace, commas and comments
fn is_blank(source: &str) -> bool {
    source.lines().all(|line| {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == ',');
        line.is_empty() || line.starts_with('#')
    })
}

/// Rewrites legacy `implements A, B` headers to `implements A & B`.
///
/// Only the clause on a `type`/`interface` header line is touched, up to the
/// first `{`, `@`, `"` or `#`. Byte offsets are kept, so reported line and
/// column numbers still match the caller's text.
fn normalize_implements(source: &str) -> Cow<'_, str> {
    if !source.contains("implements") {
        return Cow::Borrowed(source);
    }

    let mut changed = false;
    let lines: Vec<Cow<'_, str>> = source
        .split('\n')
        .map(|line| match implements_clause(line) {
            Some((start, end)) if line[start..end].contains(',') => {
                changed = true;
                Cow::Owned(format!(
                    "{}{}{}",
                    &line[..start],
                    line[start..end].replace(',', "&"),
                    &line[end..]
                ))
            }
            _ => Cow::Borrowed(line),
        })
        .collect();

    if changed {
        Cow::Owned(lines.join("\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Byte range of the interface list on a declaration header line
fn implements_clause(line: &str) -> Option<(usize, usize)> {
    let mut words = line.split_whitespace();
    if !matches!(words.next(), Some("type" | "interface")) {
        return None;
    }
    words.next()?;
    if words.next() != Some("implements") {
        return None;
    }

    let start = line.find("implements")? + "implements".len();
    let end = line[start..]
        .find(|c: char| matches!(c, '{' | '@' | '"' | '#'))
        .map_or(line.len(), |i| start + i);
    Some((start, end))
}

fn syntax_error(error: gql::ParseError) -> SyntaxError {
    let text = error.to_string();
    let (line, column) = error_position(&text).unwrap_or((1, 1));
    let detail: Vec<&str> = text
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let message = if detail.is_empty() {
        text.clone()
    } else {
        detail.join("; ")
    };
    SyntaxError::new(line, column, message)
}

/// `line:column` from the "Parse error at L:C" header
fn error_position(text: &str) -> Option<(usize, usize)> {
    let header = text.lines().next()?;
    let (_, at) = header.rsplit_once(" at ")?;
    let (line, column) = at.trim().split_once(':')?;
    Some((line.parse().ok()?, column.parse().ok()?))
}

// =============================================================================
// Lowering
// =============================================================================

fn span(pos: Pos) -> Span {
    Span::new(pos.line, pos.column)
}

fn unsupported(pos: Pos, keyword: &str) -> SyntaxError {
    SyntaxError::new(pos.line, pos.column, format!("unsupported definition `{}`", keyword))
}

fn description(text: Option<String>) -> Option<String> {
    text.map(|d| d.trim().to_string())
}

fn lower_definition(definition: Definition<'_, String>) -> Result<TypeDeclaration, SyntaxError> {
    match definition {
        Definition::TypeDefinition(TypeDefinition::Object(object)) => {
            let directives = lower_directives(object.directives)?;
            let immutable = is_immutable(&directives);
            Ok(TypeDeclaration {
                name: object.name,
                kind: DeclarationKind::Object,
                implements: object.implements_interfaces,
                fields: lower_fields(object.fields)?,
                values: Vec::new(),
                immutable,
                directives,
                description: description(object.description),
                span: span(object.position),
            })
        }
        Definition::TypeDefinition(TypeDefinition::Interface(interface)) => {
            if !interface.implements_interfaces.is_empty() {
                return Err(SyntaxError::new(
                    interface.position.line,
                    interface.position.column,
                    "`implements` is only supported on object types",
                ));
            }
            Ok(TypeDeclaration {
                name: interface.name,
                kind: DeclarationKind::Interface,
                implements: Vec::new(),
                fields: lower_fields(interface.fields)?,
                values: Vec::new(),
                immutable: false,
                directives: lower_directives(interface.directives)?,
                description: description(interface.description),
                span: span(interface.position),
            })
        }
        Definition::TypeDefinition(TypeDefinition::Enum(enumeration)) => {
            let values = enumeration
                .values
                .into_iter()
                .map(lower_enum_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeDeclaration {
                name: enumeration.name,
                kind: DeclarationKind::Enum,
                implements: Vec::new(),
                fields: Vec::new(),
                values,
                immutable: false,
                directives: lower_directives(enumeration.directives)?,
                description: description(enumeration.description),
                span: span(enumeration.position),
            })
        }
        Definition::TypeDefinition(TypeDefinition::Scalar(d)) => Err(unsupported(d.position, "scalar")),
        Definition::TypeDefinition(TypeDefinition::Union(d)) => Err(unsupported(d.position, "union")),
        Definition::TypeDefinition(TypeDefinition::InputObject(d)) => Err(unsupported(d.position, "input")),
        Definition::SchemaDefinition(d) => Err(unsupported(d.position, "schema")),
        Definition::DirectiveDefinition(d) => Err(unsupported(d.position, "directive")),
        Definition::TypeExtension(extension) => {
            let position = match extension {
                TypeExtension::Scalar(e) => e.position,
                TypeExtension::Object(e) => e.position,
                TypeExtension::Interface(e) => e.position,
                TypeExtension::Union(e) => e.position,
                TypeExtension::Enum(e) => e.position,
                TypeExtension::InputObject(e) => e.position,
            };
            Err(unsupported(position, "extend"))
        }
    }
}

fn lower_fields(fields: Vec<gql::Field<'_, String>>) -> Result<Vec<FieldDeclaration>, SyntaxError> {
    fields.into_iter().map(lower_field).collect()
}

fn lower_field(field: gql::Field<'_, String>) -> Result<FieldDeclaration, SyntaxError> {
    if !field.arguments.is_empty() {
        return Err(SyntaxError::new(
            field.position.line,
            field.position.column,
            format!("field arguments are not supported (field `{}`)", field.name),
        ));
    }

    let directives = lower_directives(field.directives)?;
    let derived_from = match find_directive(&directives, "derivedFrom") {
        Some(directive) => match directive.argument("field").and_then(Value::as_str) {
            Some(target) => Some(target.to_string()),
            None => {
                return Err(SyntaxError::new(
                    directive.span.line,
                    directive.span.column,
                    "`@derivedFrom` requires a string `field` argument",
                ))
            }
        },
        None => None,
    };

    Ok(FieldDeclaration {
        name: field.name,
        ty: lower_type(field.field_type),
        derived_from,
        directives,
        description: description(field.description),
        span: span(field.position),
    })
}

fn lower_type(ty: gql::Type<'_, String>) -> TypeRef {
    match ty {
        gql::Type::NamedType(name) => TypeRef::named(&name),
        gql::Type::ListType(inner) => TypeRef::list(lower_type(*inner)),
        gql::Type::NonNullType(inner) => TypeRef::non_null(lower_type(*inner)),
    }
}

fn lower_enum_value(value: gql::EnumValue<'_, String>) -> Result<EnumValue, SyntaxError> {
    if matches!(value.name.as_str(), "true" | "false" | "null") {
        return Err(SyntaxError::new(
            value.position.line,
            value.position.column,
            format!("`{}` cannot be used as an enum value", value.name),
        ));
    }
    Ok(EnumValue {
        name: value.name,
        directives: lower_directives(value.directives)?,
        description: description(value.description),
        span: span(value.position),
    })
}

// =============================================================================
// Directives
// =============================================================================

fn lower_directives(directives: Vec<gql::Directive<'_, String>>) -> Result<Vec<Directive>, SyntaxError> {
    directives.into_iter().map(lower_directive).collect()
}

fn lower_directive(directive: gql::Directive<'_, String>) -> Result<Directive, SyntaxError> {
    let at = directive.position;
    let arguments = directive
        .arguments
        .into_iter()
        .map(|(name, value)| lower_value(value, at).map(|value| Argument { name, value }))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Directive {
        name: directive.name,
        arguments,
        span: span(at),
    })
}

/// Argument values carry no position of their own; errors point at the directive
fn lower_value(value: gql::Value<'_, String>, at: Pos) -> Result<Value, SyntaxError> {
    let lowered = match value {
        gql::Value::String(s) => Value::String(s),
        gql::Value::Int(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => return Err(SyntaxError::new(at.line, at.column, "integer out of range")),
        },
        gql::Value::Float(f) => Value::Float(format!("{:?}", f)),
        gql::Value::Boolean(b) => Value::Boolean(b),
        gql::Value::Null => Value::Null,
        gql::Value::Enum(name) => Value::Enum(name),
        gql::Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| lower_value(item, at))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        gql::Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, item)| lower_value(item, at).map(|item| (key, item)))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        gql::Value::Variable(name) => {
            return Err(SyntaxError::new(
                at.line,
                at.column,
                format!("variable `${}` is not allowed in a schema directive", name),
            ))
        }
    };
    Ok(lowered)
}

fn is_immutable(directives: &[Directive]) -> bool {
    find_directive(directives, "entity")
        .and_then(|d| d.argument("immutable"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdl::ast::{BaseType, ScalarKind};
    use indoc::indoc;

    #[test]
    fn test_parse_entity_with_directives() {
        let doc = parse(indoc! {r#"
            " A swap event "
            type Swap @entity(immutable: true) {
              " swap-{ hash }-{ index } "
              id: ID!
              pool: LiquidityPool!
              amounts: [BigInt!]!
            }
        "#})
        .unwrap();

        let swap = doc.get("Swap").unwrap();
        assert_eq!(swap.kind, DeclarationKind::Object);
        assert!(swap.immutable);
        assert_eq!(swap.description.as_deref(), Some("A swap event"));
        assert_eq!(swap.fields.len(), 3);
        assert_eq!(swap.span.line, 2);

        let id = swap.field("id").unwrap();
        assert_eq!(id.description.as_deref(), Some("swap-{ hash }-{ index }"));
        assert_eq!(id.ty.base(), &BaseType::Scalar(ScalarKind::Id));

        let amounts = swap.field("amounts").unwrap();
        assert_eq!(amounts.ty.to_string(), "[BigInt!]!");
        assert_eq!(swap.field("pool").unwrap().ty.named_target(), Some("LiquidityPool"));
    }

    #[test]
    fn test_parse_derived_from_on_continuation_line() {
        let doc = parse(indoc! {r#"
            type DexAmmProtocol @entity {
              pools: [LiquidityPool!]!
                @derivedFrom(field: "protocol")
            }
        "#})
        .unwrap();
        let pools = doc.get("DexAmmProtocol").unwrap().field("pools").unwrap();
        assert_eq!(pools.derived_from.as_deref(), Some("protocol"));
        assert!(!doc.get("DexAmmProtocol").unwrap().immutable);
    }

    #[test]
    fn test_parse_implements_separators() {
        let doc = parse(indoc! {"
            type A implements Foo & Bar { id: ID! }
            type B implements Foo, Bar { id: ID! }
            type C implements & Foo & Bar @entity { id: ID! }
        "})
        .unwrap();
        for name in ["A", "B", "C"] {
            assert_eq!(doc.get(name).unwrap().implements, vec!["Foo", "Bar"]);
        }
    }

    #[test]
    fn test_legacy_implements_keeps_error_position() {
        let err = parse("type A { id: ID! }\ntype B implements Foo, Bar { id: ID! x: }").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_commas_in_descriptions_untouched() {
        let doc = parse(indoc! {r#"
            "implements A, B"
            type A { id: ID! }
        "#})
        .unwrap();
        assert_eq!(doc.get("A").unwrap().description.as_deref(), Some("implements A, B"));
    }

    #[test]
    fn test_parse_enum_with_commas_and_directive() {
        let doc = parse(indoc! {"
            enum SwapType @entity {
                swapExactAmountIn,
                swapExactAmountOut
            }
        "})
        .unwrap();
        let e = doc.get("SwapType").unwrap();
        assert_eq!(e.kind, DeclarationKind::Enum);
        assert_eq!(e.values.len(), 2);
        assert_eq!(e.directive("entity").unwrap().arguments.len(), 0);
    }

    #[test]
    fn test_enum_without_body() {
        let doc = parse("enum Kind type A { id: ID! kind: Kind }").unwrap();
        assert!(doc.get("Kind").unwrap().values.is_empty());
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_block_description_followed_by_comment() {
        let doc = parse(indoc! {r#"
            type FlashLoan @entity {
              """
              tx hash
              """ #
              id: ID!
            }
        "#})
        .unwrap();
        let id = doc.get("FlashLoan").unwrap().field("id").unwrap();
        assert_eq!(id.description.as_deref(), Some("tx hash"));
    }

    #[test]
    fn test_keywords_are_valid_field_names() {
        let doc = parse("type Sale @entity { id: ID! type: SaleType! enum: Int }").unwrap();
        let sale = doc.get("Sale").unwrap();
        assert_eq!(sale.fields.len(), 3);
        assert_eq!(sale.field("type").unwrap().ty.to_string(), "SaleType!");
    }

    #[test]
    fn test_unknown_directives_are_preserved() {
        let doc = parse(r#"type T @entity @fulltext(name: "s", fields: [{ name: "a" }], limit: 3) { id: ID! }"#)
            .unwrap();
        let fulltext = doc.get("T").unwrap().directive("fulltext").unwrap();
        assert_eq!(fulltext.argument("name"), Some(&Value::String("s".into())));
        assert_eq!(fulltext.argument("limit"), Some(&Value::Int(3)));
        assert_eq!(
            fulltext.argument("fields"),
            Some(&Value::List(vec![Value::Object(vec![(
                "name".into(),
                Value::String("a".into())
            )])]))
        );
    }

    #[test]
    fn test_whitespace_and_comments_do_not_change_structure() {
        let compact = parse(r#"type Pool @entity { id: ID! tokens: [Token!]! @derivedFrom(field: "pool") } type Token @entity { id: ID! pool: Pool! }"#)
            .unwrap();
        let spread = parse(indoc! {r#"
            # pools
            type Pool @entity {
                id: ID!            # primary key

                tokens: [Token!]!
                    @derivedFrom(field: "pool")
            }

            # tokens
            type Token @entity
            {
              id: ID!
              pool: Pool!
            }
        "#})
        .unwrap();
        assert_eq!(compact, spread);
    }

    #[test]
    fn test_blank_document() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# nothing here\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_body() {
        let err = parse("type Token @entity {\n  id: ID!\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_malformed_directive_arguments() {
        let err = parse("type A { id: ID! }\ntype B { b: A @derivedFrom(field \"a\") }").unwrap_err();
        assert_eq!(err.line, 2);

        let err = parse(r#"type A { b: B @derivedFrom(name: "a") }"#).unwrap_err();
        assert!(err.message.contains("requires a string `field` argument"));
        assert_eq!((err.line, err.column), (1, 15));

        assert!(parse("type A @entity() { id: ID! }").is_err());
    }

    #[test]
    fn test_unsupported_definitions() {
        let err = parse("type A { id: ID! }\nunion Thing = A").unwrap_err();
        assert!(err.message.contains("unsupported definition `union`"));
        assert_eq!(err.line, 2);

        let err = parse("scalar Timestamp").unwrap_err();
        assert!(err.message.contains("unsupported definition `scalar`"));

        let err = parse("extend type A @entity").unwrap_err();
        assert!(err.message.contains("unsupported definition `extend`"));

        let err = parse("type A { items(first: Int): [Item!]! }").unwrap_err();
        assert!(err.message.contains("field arguments are not supported"));
    }

    #[test]
    fn test_reserved_enum_values() {
        let err = parse("enum Flag { on\n  true }").unwrap_err();
        assert!(err.message.contains("`true` cannot be used as an enum value"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_dangling_description() {
        let err = parse("type A { id: ID! }\n\"orphan\"").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_interface_cannot_implement() {
        let err = parse("interface A implements B { id: ID! }").unwrap_err();
        assert!(err.message.contains("only supported on object types"));
    }
}
