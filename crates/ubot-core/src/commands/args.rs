//! Argument tokenization and type conversion.

use crate::commands::{ArgValue, Arguments, ParamKind, Parameter};

pub const TOO_FEW_PARAMETERS: &str = "The input text has too few parameters.";
pub const TOO_MANY_PARAMETERS: &str = "The input text has too many parameters.";
pub const INCOMPLETE_QUOTE: &str = "A quoted parameter is incomplete.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgError {
    /// Tokenization / arity problem.
    Parse(String),
    /// A token could not be converted to its parameter's type.
    Read(String),
}

/// Split `input` according to `params`, then convert each token.
///
/// All arity problems are reported before any conversion problem.
pub fn parse_arguments(params: &[Parameter], input: &str) -> Result<Arguments, ArgError> {
    let mut cursor = input;
    let mut raw: Vec<(&Parameter, String)> = Vec::with_capacity(params.len());

    for param in params {
        if param.kind == ParamKind::Remainder {
            let rest = cursor.trim();
            if rest.is_empty() {
                return Err(ArgError::Parse(TOO_FEW_PARAMETERS.to_string()));
            }
            raw.push((param, rest.to_string()));
            cursor = "";
            continue;
        }

        match next_token(&mut cursor)? {
            Some(token) => raw.push((param, token)),
            None => return Err(ArgError::Parse(TOO_FEW_PARAMETERS.to_string())),
        }
    }

    if next_token(&mut cursor)?.is_some() {
        return Err(ArgError::Parse(TOO_MANY_PARAMETERS.to_string()));
    }

    let mut out = Arguments::default();
    for (param, token) in raw {
        out.push(&param.name, convert(param, token)?);
    }
    Ok(out)
}

fn convert(param: &Parameter, token: String) -> Result<ArgValue, ArgError> {
    match param.kind {
        ParamKind::Int => token.trim().parse::<i64>().map(ArgValue::Int).map_err(|_| {
            ArgError::Read(format!("Failed to parse `{}` as an integer.", param.name))
        }),
        ParamKind::Word | ParamKind::Remainder => Ok(ArgValue::Text(token)),
    }
}

/// Pop the next whitespace-delimited or double-quoted token.
fn next_token(cursor: &mut &str) -> Result<Option<String>, ArgError> {
    let s = cursor.trim_start();
    if s.is_empty() {
        *cursor = s;
        return Ok(None);
    }

    if let Some(body) = s.strip_prefix('"') {
        let Some(end) = body.find('"') else {
            return Err(ArgError::Parse(INCOMPLETE_QUOTE.to_string()));
        };
        *cursor = &body[end + 1..];
        return Ok(Some(body[..end].to_string()));
    }

    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    *cursor = &s[end..];
    Ok(Some(s[..end].to_string()))
}
