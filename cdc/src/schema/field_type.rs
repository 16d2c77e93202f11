use std::fmt;
use std::str::FromStr;

use crate::bail;
use crate::error::{CdcError, ErrorKind};

/// Base type of a destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Decimal,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
            FieldType::Decimal => "decimal",
        }
    }

    /// Resolves a base type name or one of its aliases, ignoring case.
    fn from_name(name: &str) -> Option<Self> {
        let field_type = match name.to_ascii_lowercase().as_str() {
            "string" | "str" | "text" | "varchar" => FieldType::String,
            "integer" | "int" | "bigint" | "smallint" => FieldType::Integer,
            "float" | "double" | "real" => FieldType::Float,
            "boolean" | "bool" => FieldType::Boolean,
            "timestamp" | "datetime" | "timestamptz" => FieldType::Timestamp,
            "decimal" | "numeric" => FieldType::Decimal,
            _ => return None,
        };

        Some(field_type)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a field as declared in configuration.
///
/// A declared type is a [`FieldType`] optionally wrapped any number of times in `optional<..>`
/// or `annotated<.., annotation>`. Wrappers carry no meaning for transformation and are
/// unwrapped by [`DeclaredType::base_type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Base(FieldType),
    Optional(Box<DeclaredType>),
    /// Storage annotation such as `uint64` or `low_cardinality`.
    Annotated(Box<DeclaredType>, String),
}

impl DeclaredType {
    /// Returns the underlying base type with all wrappers removed.
    pub fn base_type(&self) -> FieldType {
        let mut current = self;
        loop {
            match current {
                DeclaredType::Base(field_type) => return *field_type,
                DeclaredType::Optional(inner) | DeclaredType::Annotated(inner, _) => {
                    current = inner;
                }
            }
        }
    }

    /// Returns `true` if any wrapper marks the field as optional.
    pub fn is_optional(&self) -> bool {
        match self {
            DeclaredType::Base(_) => false,
            DeclaredType::Optional(_) => true,
            DeclaredType::Annotated(inner, _) => inner.is_optional(),
        }
    }
}

impl From<FieldType> for DeclaredType {
    fn from(field_type: FieldType) -> Self {
        DeclaredType::Base(field_type)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Base(field_type) => write!(f, "{field_type}"),
            DeclaredType::Optional(inner) => write!(f, "optional<{inner}>"),
            DeclaredType::Annotated(inner, annotation) => {
                write!(f, "annotated<{inner}, {annotation}>")
            }
        }
    }
}

impl FromStr for DeclaredType {
    type Err = CdcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_declared_type(s.trim(), s)
    }
}

fn parse_declared_type(input: &str, declared: &str) -> Result<DeclaredType, CdcError> {
    if let Some(inner) = strip_wrapper(input, "optional") {
        let inner = parse_declared_type(inner.trim(), declared)?;
        return Ok(DeclaredType::Optional(Box::new(inner)));
    }

    if let Some(arguments) = strip_wrapper(input, "annotated") {
        let Some((inner, annotation)) = split_top_level_comma(arguments) else {
            bail!(
                ErrorKind::UnsupportedFieldType,
                "Unsupported field type",
                format!("'{declared}': annotated<..> requires a type and an annotation")
            );
        };

        let annotation = annotation.trim();
        if annotation.is_empty() {
            bail!(
                ErrorKind::UnsupportedFieldType,
                "Unsupported field type",
                format!("'{declared}': annotation is empty")
            );
        }

        let inner = parse_declared_type(inner.trim(), declared)?;
        return Ok(DeclaredType::Annotated(
            Box::new(inner),
            annotation.to_owned(),
        ));
    }

    match FieldType::from_name(input) {
        Some(field_type) => Ok(DeclaredType::Base(field_type)),
        None => bail!(
            ErrorKind::UnsupportedFieldType,
            "Unsupported field type",
            format!("'{declared}' does not name a supported type")
        ),
    }
}

/// Returns the argument list of `wrapper<...>`, matching the wrapper name case-insensitively.
fn strip_wrapper<'a>(input: &'a str, wrapper: &str) -> Option<&'a str> {
    let prefix = input.get(..wrapper.len())?;
    if !prefix.eq_ignore_ascii_case(wrapper) {
        return None;
    }

    input[wrapper.len()..]
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

/// Splits at the first comma that is not nested inside angle brackets.
fn split_top_level_comma(input: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (index, c) in input.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&input[..index], &input[index + 1..])),
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_base_names_and_aliases() {
        let cases = [
            ("string", FieldType::String),
            ("TEXT", FieldType::String),
            ("varchar", FieldType::String),
            ("int", FieldType::Integer),
            ("BigInt", FieldType::Integer),
            ("double", FieldType::Float),
            ("bool", FieldType::Boolean),
            ("timestamptz", FieldType::Timestamp),
            ("datetime", FieldType::Timestamp),
            ("numeric", FieldType::Decimal),
        ];

        for (input, expected) in cases {
            let declared: DeclaredType = input.parse().unwrap();
            assert_eq!(declared, DeclaredType::Base(expected), "input {input}");
        }
    }

    #[test]
    fn parse_nested_wrappers() {
        let declared: DeclaredType = "annotated<optional<string>, low_cardinality>"
            .parse()
            .unwrap();

        assert_eq!(declared.base_type(), FieldType::String);
        assert!(declared.is_optional());
        assert_eq!(
            declared,
            DeclaredType::Annotated(
                Box::new(DeclaredType::Optional(Box::new(DeclaredType::Base(
                    FieldType::String
                )))),
                "low_cardinality".to_owned()
            )
        );
        assert_eq!(
            declared.to_string(),
            "annotated<optional<string>, low_cardinality>"
        );
    }

    #[test]
    fn parse_annotated_inside_annotated() {
        let declared: DeclaredType = "Optional< annotated<annotated<int, uint8>, codec> >"
            .parse()
            .unwrap();
        assert_eq!(declared.base_type(), FieldType::Integer);
    }

    #[test]
    fn annotation_does_not_make_optional() {
        let declared: DeclaredType = "annotated<integer, uint64>".parse().unwrap();
        assert!(!declared.is_optional());
        assert_eq!(declared.base_type(), FieldType::Integer);
    }

    #[test]
    fn reject_unsupported_types() {
        for input in [
            "",
            "uuid",
            "optional<>",
            "optional<uuid>",
            "optional<string",
            "annotated<string>",
            "annotated<string, >",
            "list<string>",
        ] {
            let err = input.parse::<DeclaredType>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedFieldType, "input {input:?}");
        }
    }
}
