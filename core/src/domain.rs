use crate::error::{Error, Result};

/// A hostname split along its public-suffix boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDomain {
    /// Full normalized hostname, e.g. `sub1.example.co.uk`.
    pub name: String,
    /// Labels in front of the registrable domain, e.g. `sub1`.
    pub subdomain: Option<String>,
    /// Registrable domain including its public suffix, e.g. `example.co.uk`.
    pub registrable: String,
    /// Public suffix, e.g. `co.uk`.
    pub suffix: String,
}

/// Punycode form of `input`, lowercased. Returns the lowercased input when conversion fails.
pub fn to_ascii(input: &str) -> String {
    idna::domain_to_ascii(input).unwrap_or_else(|_| input.to_lowercase())
}

/// Display form of an ASCII domain. Labels that fail to decode stay as given.
pub fn to_unicode(input: &str) -> String {
    let (unicode, _) = idna::domain_to_unicode(input);
    unicode
}

/// Split an ASCII hostname using the public suffix list.
pub fn parse(host: &str) -> Result<ParsedDomain> {
    let host = host.trim_end_matches('.');
    let parsed = addr::parse_domain_name(host).map_err(|_| Error::DomainParsing(host.to_string()))?;
    // A bare public suffix has no registrable part.
    let registrable = parsed.root().ok_or_else(|| Error::DomainParsing(host.to_string()))?;
    let subdomain = host
        .strip_suffix(registrable)
        .and_then(|rest| rest.strip_suffix('.'))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string);

    Ok(ParsedDomain {
        name: host.to_string(),
        subdomain,
        registrable: registrable.to_string(),
        suffix: parsed.suffix().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multi_label_suffix() {
        let d = parse("a.b.example.co.uk").unwrap();
        assert_eq!(d.registrable, "example.co.uk");
        assert_eq!(d.suffix, "co.uk");
        assert_eq!(d.subdomain.as_deref(), Some("a.b"));
    }

    #[test]
    fn bare_domain_has_no_subdomain() {
        let d = parse("example.com").unwrap();
        assert_eq!(d.subdomain, None);
        assert_eq!(d.name, "example.com");
    }

    #[test]
    fn rejects_empty_labels_and_bare_suffixes() {
        assert!(matches!(parse("..."), Err(Error::DomainParsing(_))));
        assert!(matches!(parse("com"), Err(Error::DomainParsing(_))));
        assert!(parse("").is_err());
    }

    #[test]
    fn converts_idn_both_ways() {
        let ascii = to_ascii("BÜCHER.example");
        assert_eq!(ascii, "xn--bcher-kva.example");
        assert_eq!(to_unicode(&ascii), "bücher.example");
        assert_eq!(to_ascii("Gmail.COM"), "gmail.com");
    }
}
