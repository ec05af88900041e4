//! The `vp`/`fp` transform-entry grammar.

use crate::error::{IoError, IoResult};

/// A parsed transform entry: the type token plus its fixed and variable
/// parameter blocks.
///
/// An entry is a single line of the form
///
/// ```text
/// <TypeName> vp <n> <v0> ... <vn-1> fp <m> <f0> ... <fm-1>
/// ```
///
/// where the `vp` and `fp` blocks may appear in either order after the
/// type token and unknown words between blocks are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParameters {
    /// The transform type token, verbatim.
    pub name: String,
    /// Fixed parameters (`fp` block).
    pub fixed: Vec<f64>,
    /// Variable parameters (`vp` block).
    pub variable: Vec<f64>,
}

impl TransformParameters {
    /// Parse a transform entry line.
    ///
    /// # Errors
    ///
    /// [`IoError::InvalidContent`] for an empty entry, a short or
    /// malformed parameter block, or non-finite parameter values.
    pub fn parse(entry: &str) -> IoResult<Self> {
        let parts: Vec<&str> = entry.split_whitespace().collect();
        let Some(&name) = parts.first() else {
            return Err(IoError::invalid("empty transform entry"));
        };

        let mut fixed = Vec::new();
        let mut variable = Vec::new();

        let mut i = 1;
        while i < parts.len() {
            match parts[i].to_ascii_lowercase().as_str() {
                "vp" => {
                    let (values, consumed) = read_values(&parts, i + 1)?;
                    variable = values;
                    i += consumed + 1;
                }
                "fp" => {
                    let (values, consumed) = read_values(&parts, i + 1)?;
                    fixed = values;
                    i += consumed + 1;
                }
                _ => i += 1,
            }
        }

        Ok(Self {
            name: name.to_string(),
            fixed,
            variable,
        })
    }
}

/// Read a count-prefixed value block starting at `parts[start]`.
///
/// Returns the values and the number of words consumed (count word
/// included).
fn read_values(parts: &[&str], start: usize) -> IoResult<(Vec<f64>, usize)> {
    let count: usize = parts
        .get(start)
        .ok_or_else(|| IoError::invalid("parameter block missing its count"))?
        .parse()
        .map_err(|_| IoError::invalid(format!("invalid parameter count: {}", parts[start])))?;

    if parts.len() < start + 1 + count {
        return Err(IoError::invalid(format!(
            "parameter block declares {count} values but only {} remain",
            parts.len() - start - 1
        )));
    }

    let mut values = Vec::with_capacity(count);
    for word in &parts[start + 1..start + 1 + count] {
        let value: f64 = word
            .parse()
            .map_err(|_| IoError::invalid(format!("invalid parameter value: {word}")))?;
        if !value.is_finite() {
            return Err(IoError::invalid(format!(
                "non-finite parameter value: {word}"
            )));
        }
        values.push(value);
    }

    Ok((values, count + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_blocks() {
        let p = TransformParameters::parse(
            "GridTransform_double_2_2 vp 4 0 1 2 3 fp 3 10 20 30",
        )
        .unwrap();

        assert_eq!(p.name, "GridTransform_double_2_2");
        assert_eq!(p.variable, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(p.fixed, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn block_order_is_arbitrary() {
        let p = TransformParameters::parse("t fp 1 5 vp 2 1 2").unwrap();
        assert_eq!(p.fixed, vec![5.0]);
        assert_eq!(p.variable, vec![1.0, 2.0]);
    }

    #[test]
    fn unknown_words_skipped() {
        let p = TransformParameters::parse("t extra vp 1 9 trailing").unwrap();
        assert_eq!(p.variable, vec![9.0]);
        assert!(p.fixed.is_empty());
    }

    #[test]
    fn short_block_rejected() {
        assert!(TransformParameters::parse("t vp 5 1 2").is_err());
    }

    #[test]
    fn non_finite_rejected() {
        assert!(TransformParameters::parse("t vp 1 nan").is_err());
        assert!(TransformParameters::parse("t vp 1 inf").is_err());
    }

    #[test]
    fn empty_entry_rejected() {
        assert!(TransformParameters::parse("   ").is_err());
    }

    #[test]
    fn case_insensitive_block_markers() {
        let p = TransformParameters::parse("t VP 1 3 FP 1 4").unwrap();
        assert_eq!(p.variable, vec![3.0]);
        assert_eq!(p.fixed, vec![4.0]);
    }
}
