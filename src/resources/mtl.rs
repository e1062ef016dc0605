//! MTL material library parsing.

use crate::{
    data_structures::material::Material,
    error::ParseError,
    resources::{Line, lines},
};

/// Materials of one library in declaration order, plus skipped keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MtlLibrary {
    pub materials: Vec<(String, Material)>,
    pub ignored: Vec<(usize, String)>,
}

/// Parses an MTL document.
///
/// Every property mutates the material declared by the latest `newmtl`. A
/// property before the first `newmtl` fails the whole library.
pub fn parse(text: &str) -> Result<MtlLibrary, ParseError> {
    let mut library = MtlLibrary::default();

    for line in lines(text) {
        let keyword = line.keyword;
        if keyword == "newmtl" {
            let name = line.rest();
            if name.is_empty() {
                return Err(line.missing(1));
            }
            library.materials.push((name, Material::default()));
            continue;
        }

        let Some((_, material)) = library.materials.last_mut() else {
            if is_property(keyword) {
                return Err(ParseError::MissingMaterialContext {
                    line: line.number,
                    keyword: keyword.to_string(),
                });
            }
            library.ignored.push((line.number, keyword.to_string()));
            continue;
        };

        match keyword {
            "Ka" => material.ambient_color = line.floats::<3>()?,
            "Kd" => material.diffuse_color = line.floats::<3>()?,
            "Ks" => material.specular_color = line.floats::<3>()?,
            "Tf" => material.transmission_filter = line.floats::<3>()?,
            "d" => material.dissolve_factor = line.float(0)?,
            "illum" => material.illumination_model = line.int(0)?,
            "Ns" => material.specular_exponent = line.float(0)?,
            "sharpness" => material.sharpness = line.float(0)?,
            "Ni" => material.refraction_index = line.float(0)?,
            other => {
                log::debug!("line {}: ignoring unsupported MTL keyword `{}`", line.number, other);
                library.ignored.push((line.number, other.to_string()));
            }
        }
    }

    Ok(library)
}

fn is_property(keyword: &str) -> bool {
    matches!(
        keyword,
        "Ka" | "Kd" | "Ks" | "Tf" | "d" | "illum" | "Ns" | "sharpness" | "Ni"
    )
}

impl Line<'_> {
    fn int(&self, position: usize) -> Result<i32, ParseError> {
        let token = self.arg(position)?;
        token.parse::<i32>().map_err(|_| self.invalid(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_comment_is_ignored() {
        let with = parse("newmtl Foo\nKd 1.0 0.0 0.0 # red\n").unwrap();
        let without = parse("newmtl Foo\nKd 1.0 0.0 0.0\n").unwrap();
        assert_eq!(with.materials, without.materials);
        assert_eq!(with.materials[0].1.diffuse_color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn property_without_material_is_rejected() {
        let err = parse("# header\nKd 1 1 1\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingMaterialContext {
                line: 2,
                keyword: "Kd".into()
            }
        );
    }

    #[test]
    fn unknown_keywords_are_kept_as_ignored() {
        let library = parse("newmtl Foo\nmap_Kd foo.png\n").unwrap();
        assert_eq!(library.ignored, vec![(2, "map_Kd".to_string())]);
    }

    #[test]
    fn bad_number_reports_line() {
        let err = parse("newmtl Foo\nNs shiny\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                line: 2,
                token: "shiny".into()
            }
        );
    }
}
