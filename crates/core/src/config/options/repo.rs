//! Repository link options derived from `repo_url`.

use std::path::Path;

use serde_yaml::Value;

use super::{Kind, Type};
use crate::config::base::{Config, Pass, Validate};
use crate::config::errors::ValidationError;
use crate::config::value::is_truthy;

/// Lower-cased host of the repository URL stored under `key`, if any.
fn repo_host(config: &Config, key: &str) -> Option<String> {
    let repo_url = config.get_str(key).filter(|s| !s.is_empty())?;
    let parsed = url::Url::parse(repo_url).ok()?;
    parsed.host_str().map(str::to_ascii_lowercase)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Display name of the repository, derived from the host when not set.
#[derive(Debug, Clone)]
pub struct RepoName {
    repo_url_key: String,
}

impl RepoName {
    pub fn new(repo_url_key: impl Into<String>) -> Self {
        Self { repo_url_key: repo_url_key.into() }
    }
}

impl Validate for RepoName {
    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        Type::new(Kind::Str).check(&value)?;
        Ok(value)
    }

    fn post_validation(
        &self,
        _pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        if config.get(key).is_some_and(|v| !v.is_null()) {
            return Ok(());
        }
        let Some(host) = repo_host(config, &self.repo_url_key) else {
            return Ok(());
        };
        let name = match host.as_str() {
            "github.com" => "GitHub".to_string(),
            "bitbucket.org" => "Bitbucket".to_string(),
            "gitlab.com" => "GitLab".to_string(),
            other => title_case(other.split('.').next().unwrap_or(other)),
        };
        config.set(key, Value::String(name));
        Ok(())
    }
}

/// Path of the edit page relative to `repo_url`.
#[derive(Debug, Clone)]
pub struct EditUri {
    repo_url_key: String,
}

impl EditUri {
    pub fn new(repo_url_key: impl Into<String>) -> Self {
        Self { repo_url_key: repo_url_key.into() }
    }
}

impl Validate for EditUri {
    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        Type::new(Kind::Str).check(&value)?;
        Ok(value)
    }

    fn post_validation(
        &self,
        _pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        let mut edit_uri = config.get_str(key).map(str::to_string);

        if edit_uri.is_none() {
            edit_uri = match repo_host(config, &self.repo_url_key).as_deref() {
                Some("github.com" | "gitlab.com") => Some("edit/master/docs/".to_string()),
                Some("bitbucket.org") => Some("src/default/docs/".to_string()),
                _ => None,
            };
        }

        if let Some(uri) = edit_uri.as_mut()
            && !uri.is_empty()
            && !uri.ends_with('/')
            && !uri.contains(['?', '#'])
        {
            uri.push('/');
        }

        config.set(key, edit_uri.map_or(Value::Null, Value::String));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { name: Field, conversion: Conversion, spec: FormatSpec },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Path,
    PathNoExt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    None,
    Quote,
    Str,
    Repr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormatSpec {
    fill: char,
    align: Align,
    width: usize,
    precision: Option<usize>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self { fill: ' ', align: Align::Left, width: 0, precision: None }
    }
}

impl FormatSpec {
    /// Parse `[[fill]align][width][.precision]`.
    fn parse(spec: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid(format!("Invalid format specifier '{spec}'"));
        let mut out = Self::default();
        let chars: Vec<char> = spec.chars().collect();
        let align_of = |c: char| match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            _ => None,
        };

        let mut rest = &chars[..];
        if let [fill, align, tail @ ..] = rest
            && let Some(align) = align_of(*align)
        {
            out.fill = *fill;
            out.align = align;
            rest = tail;
        } else if let [align, tail @ ..] = rest
            && let Some(align) = align_of(*align)
        {
            out.align = align;
            rest = tail;
        }

        let (width, tail): (String, &[char]) = {
            let n = rest.iter().take_while(|c| c.is_ascii_digit()).count();
            (rest[..n].iter().collect(), &rest[n..])
        };
        if !width.is_empty() {
            out.width = width.parse().map_err(|_| invalid())?;
        }
        rest = tail;

        if let ['.', tail @ ..] = rest {
            let digits: String = tail.iter().collect();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            out.precision = Some(digits.parse().map_err(|_| invalid())?);
            rest = &[];
        }

        if !rest.is_empty() {
            return Err(invalid());
        }
        Ok(out)
    }

    fn apply(&self, value: &str) -> String {
        let truncated: String = match self.precision {
            Some(p) => value.chars().take(p).collect(),
            None => value.to_string(),
        };
        let len = truncated.chars().count();
        if len >= self.width {
            return truncated;
        }
        let pad = self.width - len;
        let fill = |n: usize| self.fill.to_string().repeat(n);
        match self.align {
            Align::Left => format!("{truncated}{}", fill(pad)),
            Align::Right => format!("{}{truncated}", fill(pad)),
            Align::Center => format!("{}{truncated}{}", fill(pad / 2), fill(pad - pad / 2)),
        }
    }
}

/// Percent-encode every byte outside the unreserved URL set.
fn quote(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// A parsed edit-link template such as `edit/main/docs/{path!q}`.
///
/// Fields are `path` and `path_noext`; conversions are `q` (percent-encode),
/// `s` and `r`; `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTemplate {
    segments: Vec<Segment>,
}

impl EditTemplate {
    pub fn parse(template: &str) -> Result<Self, ValidationError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(ValidationError::invalid("Single '}' encountered in format string"));
                }
                '{' => {
                    if chars.peek().is_none() {
                        return Err(ValidationError::invalid("Single '{' encountered in format string"));
                    }
                    let mut body = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(ValidationError::invalid("expected '}' before end of string"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Self::parse_field(&body)?);
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    fn parse_field(body: &str) -> Result<Segment, ValidationError> {
        let (head, spec) = match body.split_once(':') {
            Some((head, spec)) => (head, FormatSpec::parse(spec)?),
            None => (body, FormatSpec::default()),
        };
        let (name, conversion) = match head.split_once('!') {
            Some((name, conv)) => {
                let conversion = match conv {
                    "q" => Conversion::Quote,
                    "s" => Conversion::Str,
                    "r" => Conversion::Repr,
                    other if other.chars().count() == 1 => {
                        return Err(ValidationError::invalid(format!(
                            "Unknown conversion specifier {other}"
                        )));
                    }
                    _ => {
                        return Err(ValidationError::invalid(
                            "expected ':' after conversion specifier",
                        ));
                    }
                };
                (name, conversion)
            }
            None => (head, Conversion::None),
        };
        let name = match name {
            "path" => Field::Path,
            "path_noext" => Field::PathNoExt,
            other => {
                return Err(ValidationError::invalid(format!(
                    "Unknown template substitute: '{other}'"
                )));
            }
        };
        Ok(Segment::Field { name, conversion, spec })
    }

    /// Substitute `path` (a docs-relative source path) into the template.
    pub fn render(&self, path: &str) -> String {
        let path_noext = Path::new(path).with_extension("").to_string_lossy().into_owned();
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { name, conversion, spec } => {
                    let value = match name {
                        Field::Path => path,
                        Field::PathNoExt => path_noext.as_str(),
                    };
                    let converted = match conversion {
                        Conversion::None | Conversion::Str => value.to_string(),
                        Conversion::Quote => quote(value),
                        Conversion::Repr => format!("'{value}'"),
                    };
                    out.push_str(&spec.apply(&converted));
                }
            }
        }
        out
    }
}

/// A templated edit link. Takes precedence over the plain edit URI.
#[derive(Debug, Clone)]
pub struct EditUriTemplate {
    edit_uri_key: String,
}

impl EditUriTemplate {
    pub fn new(edit_uri_key: impl Into<String>) -> Self {
        Self { edit_uri_key: edit_uri_key.into() }
    }

    /// Render the template stored in a validated container for `path`.
    pub fn render(config: &Config, key: &str, path: &str) -> Option<String> {
        let template = EditTemplate::parse(config.get_str(key)?).ok()?;
        Some(template.render(path))
    }
}

impl Validate for EditUriTemplate {
    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        Type::new(Kind::Str).check(&value)?;
        if let Some(template) = value.as_str() {
            EditTemplate::parse(template)?;
        }
        Ok(value)
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        let template_set = config.get(key).is_some_and(is_truthy);
        let edit_uri_set = config.get(&self.edit_uri_key).is_some_and(is_truthy);
        if template_set && edit_uri_set {
            pass.warn(format!(
                "The option '{}' has no effect when '{key}' is set.",
                self.edit_uri_key
            ));
        }
        Ok(())
    }
}
