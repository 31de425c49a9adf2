//! Site pair sources.
//!
//! Pairs come from a two-column CSV (`SourceUrl,TargetUrl`) or are generated
//! from a list of source URLs by swapping the tenant host.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use url::Url;

use crate::config::SiteComparePair;
use crate::error_handling::PairImportError;

const SOURCE_COLUMN: &str = "SourceUrl";
const TARGET_COLUMN: &str = "TargetUrl";

/// Reads site pairs from a CSV file. See [`read_pairs_csv`].
pub fn read_pairs_csv_path(path: &Path) -> Result<Vec<SiteComparePair>, PairImportError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    read_pairs_csv(file)
}

/// Reads site pairs from CSV with a `SourceUrl,TargetUrl` header.
///
/// Header names are matched case-insensitively and may appear in any order;
/// extra columns are ignored. Rows whose two URLs are both blank are skipped.
pub fn read_pairs_csv<R: Read>(reader: R) -> Result<Vec<SiteComparePair>, PairImportError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let source_idx = column_index(&headers, SOURCE_COLUMN)?;
    let target_idx = column_index(&headers, TARGET_COLUMN)?;

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let source = record.get(source_idx).unwrap_or_default();
        let target = record.get(target_idx).unwrap_or_default();
        if source.is_empty() && target.is_empty() {
            continue;
        }
        check_url(source, line)?;
        check_url(target, line)?;
        pairs.push(SiteComparePair::new(source, target));
    }
    Ok(pairs)
}

fn column_index(headers: &StringRecord, name: &'static str) -> Result<usize, PairImportError> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
        .ok_or(PairImportError::MissingColumn(name))
}

fn check_url(url: &str, line: u64) -> Result<Url, PairImportError> {
    let invalid = |reason: String| PairImportError::InvalidUrl {
        url: url.to_string(),
        line,
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Pairs every source URL with the same site on another tenant host.
///
/// `https://contoso.sharepoint.com/sites/hr` with `from_host =
/// "contoso.sharepoint.com"` and `to_host = "fabrikam.sharepoint.com"` pairs
/// with `https://fabrikam.sharepoint.com/sites/hr`. Path, query and scheme are
/// kept as they are.
///
/// # Errors
///
/// Fails on the first URL that does not parse or is not on `from_host`.
pub fn substitute_tenant_domain<I, S>(
    source_urls: I,
    from_host: &str,
    to_host: &str,
) -> Result<Vec<SiteComparePair>, PairImportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pairs = Vec::new();
    for (index, source) in source_urls.into_iter().enumerate() {
        let source = source.as_ref().trim();
        if source.is_empty() {
            continue;
        }
        let line = index as u64 + 1;
        let mut target = check_url(source, line)?;
        let on_source_host = target
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(from_host));
        if !on_source_host {
            return Err(PairImportError::HostMismatch {
                url: source.to_string(),
                expected_host: from_host.to_string(),
            });
        }
        target
            .set_host(Some(to_host))
            .map_err(|e| PairImportError::InvalidUrl {
                url: source.to_string(),
                line,
                reason: format!("cannot use host '{to_host}': {e}"),
            })?;

        let mut target = target.to_string();
        // Url always renders a root path; keep the source's form when it had none
        if !source.ends_with('/') && target.ends_with('/') {
            target.pop();
        }
        pairs.push(SiteComparePair::new(source, target));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_pairs_csv() {
        let csv = "SourceUrl,TargetUrl\n\
                   https://contoso.sharepoint.com/sites/hr,https://fabrikam.sharepoint.com/sites/hr\n\
                   https://contoso.sharepoint.com/sites/it , https://fabrikam.sharepoint.com/sites/it\n";
        let pairs = read_pairs_csv(csv.as_bytes()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].source_url, "https://contoso.sharepoint.com/sites/it");
        assert_eq!(pairs[1].target_url, "https://fabrikam.sharepoint.com/sites/it");
    }

    #[test]
    fn test_read_pairs_csv_header_order_and_case() {
        let csv = "Notes,targeturl,SOURCEURL\n\
                   first,https://b.example.com/s,https://a.example.com/s\n\
                   ,,\n";
        let pairs = read_pairs_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            pairs,
            vec![SiteComparePair::new("https://a.example.com/s", "https://b.example.com/s")]
        );
    }

    #[test]
    fn test_read_pairs_csv_missing_column() {
        let csv = "SourceUrl,Destination\nhttps://a.example.com,https://b.example.com\n";
        let err = read_pairs_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PairImportError::MissingColumn("TargetUrl")));
    }

    #[test]
    fn test_read_pairs_csv_rejects_bad_url() {
        let csv = "SourceUrl,TargetUrl\n\
                   https://a.example.com/s,https://b.example.com/s\n\
                   ftp://a.example.com/x,https://b.example.com/x\n";
        match read_pairs_csv(csv.as_bytes()).unwrap_err() {
            PairImportError::InvalidUrl { url, line, .. } => {
                assert_eq!(url, "ftp://a.example.com/x");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_pairs_csv_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        std::fs::write(
            &path,
            "SourceUrl,TargetUrl\nhttps://a.example.com/s,https://b.example.com/s\n",
        )
        .unwrap();
        assert_eq!(read_pairs_csv_path(&path).unwrap().len(), 1);
        assert!(read_pairs_csv_path(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn test_substitute_tenant_domain() {
        let pairs = substitute_tenant_domain(
            [
                "https://contoso.sharepoint.com/sites/hr",
                "https://CONTOSO.sharepoint.com/sites/Team%20A/",
                "",
            ],
            "contoso.sharepoint.com",
            "fabrikam.sharepoint.com",
        )
        .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].target_url, "https://fabrikam.sharepoint.com/sites/hr");
        assert_eq!(
            pairs[1].target_url,
            "https://fabrikam.sharepoint.com/sites/Team%20A/"
        );
    }

    #[test]
    fn test_substitute_tenant_domain_root_site() {
        let pairs = substitute_tenant_domain(
            ["https://contoso.sharepoint.com"],
            "contoso.sharepoint.com",
            "fabrikam.sharepoint.com",
        )
        .unwrap();
        assert_eq!(pairs[0].target_url, "https://fabrikam.sharepoint.com");
    }

    #[test]
    fn test_substitute_tenant_domain_host_mismatch() {
        let err = substitute_tenant_domain(
            ["https://other.sharepoint.com/sites/hr"],
            "contoso.sharepoint.com",
            "fabrikam.sharepoint.com",
        )
        .unwrap_err();
        assert!(matches!(err, PairImportError::HostMismatch { .. }));
    }
}
