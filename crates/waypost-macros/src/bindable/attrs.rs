//! Attribute parsing for the Bindable derive macro.
//!
//! Field attributes live in `#[bind(...)]`, container attributes in
//! `#[bindable(...)]`. The `rename` and `rename_all` keys of `#[serde(...)]`
//! are read too, so bound objects use the same keys serde expects.

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Expr, ExprLit, ExprUnary, Lit, Meta, MetaList, Path, Result, Token, UnOp,
};

/// One declarative validation rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required {
        message: Option<String>,
    },
    Length {
        min: Option<u64>,
        max: u64,
        message: Option<String>,
    },
    Range {
        min: f64,
        max: f64,
        message: Option<String>,
    },
    Pattern(String),
    Custom(Path),
}

/// Field-level attributes from `#[bind(...)]`.
#[derive(Debug, Clone)]
pub struct BindAttr {
    pub skip: bool,
    pub read_only: bool,
    pub keep_empty: bool,
    /// Request key for this property (default: the serialized field name).
    pub rename: Option<String>,
    pub display: Option<String>,
    pub rules: Vec<Rule>,
    pub setter: Option<Path>,
    pub span: Span,
}

impl Default for BindAttr {
    fn default() -> Self {
        BindAttr {
            skip: false,
            read_only: false,
            keep_empty: false,
            rename: None,
            display: None,
            rules: Vec::new(),
            setter: None,
            span: Span::call_site(),
        }
    }
}

impl Parse for BindAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = BindAttr {
            span: input.span(),
            ..BindAttr::default()
        };

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,
                Meta::Path(p) if p.is_ident("read_only") => attr.read_only = true,
                Meta::Path(p) if p.is_ident("keep_empty") => attr.keep_empty = true,
                Meta::Path(p) if p.is_ident("required") => {
                    attr.rules.push(Rule::Required { message: None })
                }

                Meta::NameValue(nv) if nv.path.is_ident("required") => {
                    attr.rules.push(Rule::Required {
                        message: Some(lit_str(&nv.value, "required")?),
                    })
                }
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    attr.rename = Some(lit_str(&nv.value, "rename")?)
                }
                Meta::NameValue(nv) if nv.path.is_ident("display") => {
                    attr.display = Some(lit_str(&nv.value, "display")?)
                }
                Meta::NameValue(nv) if nv.path.is_ident("pattern") => {
                    attr.rules.push(parse_pattern(&nv.value)?)
                }
                Meta::NameValue(nv) if nv.path.is_ident("validate") => {
                    attr.rules.push(Rule::Custom(path_value(&nv.value, "validate")?))
                }
                Meta::NameValue(nv) if nv.path.is_ident("setter") => {
                    attr.setter = Some(path_value(&nv.value, "setter")?)
                }

                Meta::List(list) if list.path.is_ident("length") => {
                    attr.rules.push(parse_length(list)?)
                }
                Meta::List(list) if list.path.is_ident("range") => {
                    attr.rules.push(parse_range(list)?)
                }

                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown bind attribute. Expected: skip, read_only, keep_empty, required, \
                         rename = \"...\", display = \"...\", pattern = \"...\", validate = path, \
                         setter = path, length(...), or range(...)",
                    ));
                }
            }
        }

        Ok(attr)
    }
}

/// Anchored the same way `Validator::pattern` anchors it at runtime.
fn parse_pattern(expr: &Expr) -> Result<Rule> {
    let pattern = lit_str(expr, "pattern")?;
    if let Err(e) = regex::Regex::new(&format!("^(?:{})$", pattern)) {
        return Err(Error::new(expr.span(), format!("invalid pattern: {}", e)));
    }
    Ok(Rule::Pattern(pattern))
}

fn parse_length(list: &MetaList) -> Result<Rule> {
    let mut min = None;
    let mut max = None;
    let mut message = None;
    for nv in name_values(list)? {
        if nv.0 == "min" {
            min = Some(int_value(&nv.1)?);
        } else if nv.0 == "max" {
            max = Some(int_value(&nv.1)?);
        } else if nv.0 == "message" {
            message = Some(lit_str(&nv.1, "message")?);
        } else {
            return Err(Error::new(nv.1.span(), "expected min, max or message"));
        }
    }
    let max = max.ok_or_else(|| Error::new(list.span(), "length(...) requires max"))?;
    Ok(Rule::Length { min, max, message })
}

fn parse_range(list: &MetaList) -> Result<Rule> {
    let mut min = None;
    let mut max = None;
    let mut message = None;
    for nv in name_values(list)? {
        if nv.0 == "min" {
            min = Some(float_value(&nv.1)?);
        } else if nv.0 == "max" {
            max = Some(float_value(&nv.1)?);
        } else if nv.0 == "message" {
            message = Some(lit_str(&nv.1, "message")?);
        } else {
            return Err(Error::new(nv.1.span(), "expected min, max or message"));
        }
    }
    match (min, max) {
        (Some(min), Some(max)) => Ok(Rule::Range { min, max, message }),
        _ => Err(Error::new(list.span(), "range(...) requires min and max")),
    }
}

fn name_values(list: &MetaList) -> Result<Vec<(String, Expr)>> {
    let metas = list.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
    metas
        .into_iter()
        .map(|meta| match meta {
            Meta::NameValue(nv) => {
                let name = nv
                    .path
                    .get_ident()
                    .map(|i| i.to_string())
                    .ok_or_else(|| Error::new(nv.path.span(), "expected identifier"))?;
                Ok((name, nv.value))
            }
            other => Err(Error::new(other.span(), "expected `name = value`")),
        })
        .collect()
}

fn lit_str(expr: &Expr, key: &str) -> Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(Error::new(
            expr.span(),
            format!("{} must be a string literal", key),
        )),
    }
}

fn path_value(expr: &Expr, key: &str) -> Result<Path> {
    match expr {
        Expr::Path(p) => Ok(p.path.clone()),
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => s.parse::<Path>(),
        _ => Err(Error::new(
            expr.span(),
            format!("{} must be a function path", key),
        )),
    }
}

fn int_value(expr: &Expr) -> Result<u64> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(i), ..
        }) => i.base10_parse(),
        _ => Err(Error::new(expr.span(), "expected an integer literal")),
    }
}

fn float_value(expr: &Expr) -> Result<f64> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(i), ..
        }) => i.base10_parse::<i64>().map(|v| v as f64),
        Expr::Lit(ExprLit {
            lit: Lit::Float(f), ..
        }) => f.base10_parse(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => float_value(expr).map(|v| -v),
        _ => Err(Error::new(expr.span(), "expected a numeric literal")),
    }
}

/// Container-level attributes from `#[bindable(...)]`.
#[derive(Debug, Clone, Default)]
pub struct BindableAttr {
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub display: Option<String>,
    /// Create fresh models from `Default` instead of per-field defaults.
    pub default: bool,
}

impl Parse for BindableAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = BindableAttr::default();
        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("default") => attr.default = true,
                Meta::NameValue(nv) if nv.path.is_ident("include") => {
                    attr.include = Some(lit_str(&nv.value, "include")?)
                }
                Meta::NameValue(nv) if nv.path.is_ident("exclude") => {
                    attr.exclude = Some(lit_str(&nv.value, "exclude")?)
                }
                Meta::NameValue(nv) if nv.path.is_ident("display") => {
                    attr.display = Some(lit_str(&nv.value, "display")?)
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown bindable attribute. Expected: default, include = \"...\", \
                         exclude = \"...\", or display = \"...\"",
                    ));
                }
            }
        }

        Ok(attr)
    }
}

/// The serde keys that affect serialized names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerdeNames {
    pub rename: Option<String>,
    pub rename_all: Option<String>,
    /// `skip` or `skip_deserializing`: serde never reads this field.
    pub skip: bool,
}

/// Extract `#[bind(...)]` attributes from a field's attributes.
pub fn parse_bind_attrs(attrs: &[Attribute]) -> Result<BindAttr> {
    for attr in attrs {
        if attr.path().is_ident("bind") {
            return attr.parse_args::<BindAttr>();
        }
    }
    Ok(BindAttr::default())
}

/// Extract `#[bindable(...)]` attributes from a container's attributes.
pub fn parse_bindable_attrs(attrs: &[Attribute]) -> Result<BindableAttr> {
    for attr in attrs {
        if attr.path().is_ident("bindable") {
            return attr.parse_args::<BindableAttr>();
        }
    }
    Ok(BindableAttr::default())
}

/// Read `rename`, `rename_all` and `skip` out of `#[serde(...)]`, ignoring
/// other keys.
pub fn parse_serde_names(attrs: &[Attribute]) -> Result<SerdeNames> {
    let mut names = SerdeNames::default();
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in metas {
            match &meta {
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    names.rename = Some(lit_str(&nv.value, "rename")?)
                }
                Meta::NameValue(nv) if nv.path.is_ident("rename_all") => {
                    names.rename_all = Some(lit_str(&nv.value, "rename_all")?)
                }
                Meta::Path(p) if p.is_ident("skip") || p.is_ident("skip_deserializing") => {
                    names.skip = true
                }
                _ => {}
            }
        }
    }
    Ok(names)
}

/// Apply a serde `rename_all` rule to a snake_case field or PascalCase variant.
pub fn apply_rename_all(rule: &str, name: &str, span: Span) -> Result<String> {
    let words = split_words(name);
    let joined = match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "snake_case" => words.join("_"),
        "SCREAMING_SNAKE_CASE" => words.join("_").to_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_uppercase(),
        "camelCase" => {
            let pascal: String = words.iter().map(|w| capitalize(w)).collect();
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        other => {
            return Err(Error::new(
                span,
                format!("unsupported rename_all rule: '{}'", other),
            ))
        }
    };
    Ok(joined)
}

/// Lowercase words of a snake_case or PascalCase identifier.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in name.chars() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.extend(c.to_lowercase());
        } else {
            current.extend(c.to_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
