//! Canonical SDL printer
//!
//! Two-space indentation, one field per line, block descriptions only when
//! the text spans lines. Empty bodies print without braces. Parsing the output yields an equal document.

use std::fmt::{self, Write};

use super::ast::{Directive, EnumValue, FieldDeclaration, ParsedDocument, TypeDeclaration, Value};

impl fmt::Display for ParsedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, declaration) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            write!(f, "{}", declaration)?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_description(f, self.description.as_deref(), "")?;
        write!(f, "{} {}", self.kind, self.name)?;
        if !self.implements.is_empty() {
            write!(f, " implements {}", self.implements.join(" & "))?;
        }
        write_directives(f, &self.directives)?;
        if self.fields.is_empty() && self.values.is_empty() {
            return f.write_char('\n');
        }
        f.write_str(" {\n")?;
        for field in &self.fields {
            write!(f, "{}", field)?;
        }
        for value in &self.values {
            write!(f, "{}", value)?;
        }
        f.write_str("}\n")
    }
}

impl fmt::Display for FieldDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_description(f, self.description.as_deref(), "  ")?;
        write!(f, "  {}: {}", self.name, self.ty)?;
        write_directives(f, &self.directives)?;
        f.write_char('\n')
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_description(f, self.description.as_deref(), "  ")?;
        write!(f, "  {}", self.name)?;
        write_directives(f, &self.directives)?;
        f.write_char('\n')
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write_quoted(f, s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(raw) => f.write_str(raw),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Null => f.write_str("null"),
            Self::Enum(name) => f.write_str(name),
            Self::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
            Self::Object(entries) => {
                f.write_str("{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str(" }")
            }
        }
    }
}

fn write_directives(f: &mut fmt::Formatter<'_>, directives: &[Directive]) -> fmt::Result {
    for directive in directives {
        write!(f, " @{}", directive.name)?;
        if !directive.arguments.is_empty() {
            f.write_char('(')?;
            for (i, arg) in directive.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", arg.name, arg.value)?;
            }
            f.write_char(')')?;
        }
    }
    Ok(())
}

fn write_description(f: &mut fmt::Formatter<'_>, description: Option<&str>, indent: &str) -> fmt::Result {
    let Some(text) = description else {
        return Ok(());
    };
    if text.contains('\n') || text.contains('"') {
        writeln!(f, "{}\"\"\"", indent)?;
        for line in text.lines() {
            if line.is_empty() {
                f.write_char('\n')?;
            } else {
                writeln!(f, "{}{}", indent, line.replace("\"\"\"", "\\\"\"\""))?;
            }
        }
        writeln!(f, "{}\"\"\"", indent)
    } else {
        f.write_str(indent)?;
        write_quoted(f, text)?;
        f.write_char('\n')
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use crate::sdl::parse;

    #[test]
    fn test_printed_document_reparses_equal() {
        let source = include_str!("../../schemas/decentraland.graphql");
        let doc = parse(source).unwrap();
        let printed = doc.to_string();
        assert_eq!(parse(&printed).unwrap(), doc);
    }

    #[test]
    fn test_print_shape() {
        let doc = parse(r#"type Pool implements Named @entity(immutable: true) { "the id" id: ID! tokens: [Token!] @derivedFrom(field: "pool") }"#)
            .unwrap();
        assert_eq!(
            doc.to_string(),
            "type Pool implements Named @entity(immutable: true) {\n  \"the id\"\n  id: ID!\n  tokens: [Token!] @derivedFrom(field: \"pool\")\n}\n"
        );
    }
}
