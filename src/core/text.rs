//! Resource-spec string grammar.
//!
//! Format: `<NAME>{:|=}<VALUE>` tokens separated by `,`, `+`, or `;`.
//! Names are case-insensitive; `ALL` maps to the unbounded amount; memory
//! values accept binary-suffix shorthand; generic resources use
//! `gres=<name>[:<count>]` with the count defaulting to 1 and unknown
//! names auto-registering through the catalog.

use crate::core::catalog::ResourceCatalog;
use crate::core::error::AdmissionError;
use crate::core::vector::{ResourceAmount, ResourceVector, ScalarDimension};
use crate::util::memspec;

/// Rendering mode for [`ResourceVector::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Human readable, memory values in shorthand.
    Human,
    /// Machine readable `NAME=VALUE;...` form.
    AttrValue,
    /// Human readable with values rendered as percentages.
    Verbose,
}

impl ResourceVector {
    /// Render the vector. Zero dimensions are omitted; unbounded amounts
    /// render as `ALL`; an empty vector renders as `NONE`. A positive
    /// `walltime` divides every value first (per-second rates).
    #[must_use]
    pub fn render(&self, walltime: i64, mode: FormatMode, catalog: &ResourceCatalog) -> String {
        let mut out = String::new();
        let separator = match mode {
            FormatMode::AttrValue => ";",
            _ => "  ",
        };

        for dim in ScalarDimension::ALL {
            let amount = self.amount(dim);
            if amount.is_zero() {
                continue;
            }
            if !out.is_empty() {
                out.push_str(separator);
            }
            let label = dim.label();
            match amount.known() {
                Some(value) if value > 0 => {
                    let shown = if walltime > 0 { value / walltime } else { value };
                    match mode {
                        FormatMode::Verbose => {
                            let percent = shown as f64 / 100.0;
                            out.push_str(&format!("{label}: {percent:.2}"));
                        }
                        FormatMode::AttrValue => out.push_str(&format!("{label}={shown}")),
                        FormatMode::Human => {
                            if dim.is_memory_like() {
                                out.push_str(&format!("{label}: {}", memspec::format_mb(shown)));
                            } else {
                                out.push_str(&format!("{label}: {shown}"));
                            }
                        }
                    }
                }
                // Unbounded, and any negative transient, renders as ALL.
                _ => match mode {
                    FormatMode::AttrValue => out.push_str(&format!("{label}=ALL")),
                    _ => out.push_str(&format!("{label}: ALL")),
                },
            }
        }

        for (idx, count) in self.gres.iter() {
            let name = catalog.name(idx).unwrap_or("unknown");
            if !out.is_empty() {
                out.push_str(separator);
            }
            match mode {
                FormatMode::AttrValue => out.push_str(&format!("gres={name}:{count}")),
                _ => out.push_str(&format!("{name}: {count}")),
            }
        }

        if out.is_empty() {
            out.push_str("NONE");
        }
        out
    }

    /// Parse a resource-spec string, auto-registering unknown generic
    /// resources.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::InvalidArgument`] on a malformed or unrecognized
    /// token.
    pub fn parse_spec(
        input: &str,
        catalog: &mut ResourceCatalog,
    ) -> Result<Self, AdmissionError> {
        let mut out = Self::new();

        for raw in input.split([',', '+', ';']) {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }

            let Some(split_at) = token.find([':', '=']) else {
                return Err(AdmissionError::InvalidArgument(format!(
                    "malformed resource token `{token}`"
                )));
            };
            let key = token[..split_at].trim().to_ascii_lowercase();
            let value = token[split_at + 1..].trim();

            match key.as_str() {
                "gres" => {
                    let (name, count) = match value.split_once(':') {
                        Some((name, count)) => {
                            let count = count.trim().parse::<i64>().map_err(|_| {
                                AdmissionError::InvalidArgument(format!(
                                    "bad generic-resource count in `{token}`"
                                ))
                            })?;
                            (name.trim(), count)
                        }
                        None => (value, 1),
                    };
                    if name.is_empty() {
                        return Err(AdmissionError::InvalidArgument(format!(
                            "empty generic-resource name in `{token}`"
                        )));
                    }
                    let idx = catalog.register(name);
                    out.gres.add_count(idx, count);
                }
                "procs" | "proc" => out.procs = parse_count(token, value)?,
                "mem" => out.mem = parse_memory(token, value)?,
                "disk" => out.disk = parse_memory(token, value)?,
                "swap" => out.swap = parse_memory(token, value)?,
                _ => {
                    return Err(AdmissionError::InvalidArgument(format!(
                        "unrecognized resource token `{token}`"
                    )));
                }
            }
        }

        Ok(out)
    }
}

fn parse_count(token: &str, value: &str) -> Result<ResourceAmount, AdmissionError> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(ResourceAmount::All);
    }
    value.parse::<i64>().map(ResourceAmount::Fixed).map_err(|_| {
        AdmissionError::InvalidArgument(format!("bad processor count in `{token}`"))
    })
}

fn parse_memory(token: &str, value: &str) -> Result<ResourceAmount, AdmissionError> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(ResourceAmount::All);
    }
    memspec::parse_mb(value)
        .map(ResourceAmount::Fixed)
        .ok_or_else(|| {
            AdmissionError::InvalidArgument(format!("bad memory value in `{token}`"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::GresIndex;

    #[test]
    fn test_parse_round_trips_attr_value() {
        let mut catalog = ResourceCatalog::new();
        let parsed =
            ResourceVector::parse_spec("procs=4,mem=2048,gres=gpu:1", &mut catalog).expect("spec");
        assert_eq!(parsed.procs, ResourceAmount::Fixed(4));
        assert_eq!(parsed.mem, ResourceAmount::Fixed(2048));
        assert_eq!(parsed.gres.count(GresIndex(1)), 1);

        let rendered = parsed.render(0, FormatMode::AttrValue, &catalog);
        assert_eq!(rendered, "PROCS=4;MEM=2048;gres=gpu:1");
    }

    #[test]
    fn test_parse_all_and_shorthand() {
        let mut catalog = ResourceCatalog::new();
        let parsed =
            ResourceVector::parse_spec("PROCS=ALL;mem=2g;swap:512", &mut catalog).expect("spec");
        assert_eq!(parsed.procs, ResourceAmount::All);
        assert_eq!(parsed.mem, ResourceAmount::Fixed(2048));
        assert_eq!(parsed.swap, ResourceAmount::Fixed(512));
        assert_eq!(
            parsed.render(0, FormatMode::AttrValue, &catalog),
            "PROCS=ALL;MEM=2048;SWAP=512"
        );
    }

    #[test]
    fn test_parse_gres_defaults_and_accumulates() {
        let mut catalog = ResourceCatalog::new();
        let parsed = ResourceVector::parse_spec("gres=matlab,gres=matlab:2", &mut catalog)
            .expect("spec");
        let idx = catalog.lookup("matlab").expect("registered");
        assert_eq!(parsed.gres.count(idx), 3);
    }

    #[test]
    fn test_parse_rejects_unknown_token() {
        let mut catalog = ResourceCatalog::new();
        assert!(ResourceVector::parse_spec("widgets=4", &mut catalog).is_err());
        assert!(ResourceVector::parse_spec("procs", &mut catalog).is_err());
        assert!(ResourceVector::parse_spec("mem=abc", &mut catalog).is_err());
    }

    #[test]
    fn test_render_human_and_verbose() {
        let mut catalog = ResourceCatalog::new();
        let gpu = catalog.register("gpu");
        let mut v = ResourceVector::fixed(4, 2048, 0, 0);
        v.gres.set_count(gpu, 2);

        assert_eq!(
            v.render(0, FormatMode::Human, &catalog),
            "PROCS: 4  MEM: 2G  gpu: 2"
        );
        assert_eq!(
            v.render(0, FormatMode::Verbose, &catalog),
            "PROCS: 0.04  MEM: 20.48  gpu: 2"
        );
    }

    #[test]
    fn test_render_empty_is_none() {
        let catalog = ResourceCatalog::new();
        assert_eq!(
            ResourceVector::new().render(0, FormatMode::AttrValue, &catalog),
            "NONE"
        );
    }

    #[test]
    fn test_render_divides_by_walltime() {
        let catalog = ResourceCatalog::new();
        let v = ResourceVector::fixed(0, 7200, 0, 0);
        assert_eq!(
            v.render(3600, FormatMode::AttrValue, &catalog),
            "MEM=2"
        );
    }
}
