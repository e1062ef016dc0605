/**
 * This module contains all logic for loading meshes, materials, shaders and
 * textures from external files, plus the table they are registered in.
 */
pub mod mtl;
pub mod obj;
pub mod shader;
pub mod table;
pub mod texture;

use crate::error::ParseError;

/// A non-empty line of an OBJ or MTL document with its comment removed.
pub(crate) struct Line<'a> {
    pub number: usize,
    pub keyword: &'a str,
    pub args: Vec<&'a str>,
}

/// Splits `text` into keyword lines. Everything from the first `#` on is a comment.
pub(crate) fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    text.lines().enumerate().filter_map(|(i, raw)| {
        let content = raw.split_once('#').map_or(raw, |(before, _)| before);
        let mut tokens = content.split_whitespace();
        let keyword = tokens.next()?;
        Some(Line {
            number: i + 1,
            keyword,
            args: tokens.collect(),
        })
    })
}

impl<'a> Line<'a> {
    /// The arguments joined by single spaces.
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }

    pub fn arg(&self, position: usize) -> Result<&'a str, ParseError> {
        self.args
            .get(position)
            .copied()
            .ok_or_else(|| self.missing(position + 1))
    }

    pub fn float(&self, position: usize) -> Result<f32, ParseError> {
        let token = self.arg(position)?;
        token.parse::<f32>().map_err(|_| self.invalid(token))
    }

    /// The first `N` arguments as floats. Extra arguments are ignored.
    pub fn floats<const N: usize>(&self) -> Result<[f32; N], ParseError> {
        let mut values = [0.0; N];
        for (position, value) in values.iter_mut().enumerate() {
            *value = self.float(position)?;
        }
        Ok(values)
    }

    pub fn missing(&self, expected: usize) -> ParseError {
        ParseError::MissingArgument {
            line: self.number,
            keyword: self.keyword.to_string(),
            expected,
        }
    }

    pub fn invalid(&self, token: &str) -> ParseError {
        ParseError::InvalidNumber {
            line: self.number,
            token: token.to_string(),
        }
    }
}
