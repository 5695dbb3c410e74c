// Collection-page scraping.
//
// The Greco-Roman collection page lists every work in table rows: visible
// rows (`tr.trResults`) carry the author in a `td.tdAuthor` cell, while
// collapsed rows (`tr.trHiddenResults`) only carry it in the row's `id`
// attribute, polluted with chunk numbers. Both kinds link the title through
// an `a.aResultsHeader` anchor whose href holds the percent-encoded document
// id after `doc=`, and name the language in the text right after the anchor.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// One cataloged work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Work ID")]
    pub work_id: String,
}

/// Extract every work from the collection page HTML.
///
/// Rows without a results anchor or without a `doc=` parameter are skipped;
/// a row with no recognizable language still yields a work with an empty
/// language field so nothing silently disappears from the catalog.
pub fn parse_collection(html: &str) -> Result<Vec<Work>> {
    let doc = Html::parse_document(html);
    let language_re = Regex::new(r"(Greek|Latin|English)")?;
    let id_noise_re = Regex::new(r"\b\d+\b|,\d+")?;

    let mut works = extract_rows(&doc, "tr.trResults", &language_re, |row| {
        visible_author(row)
    })?;
    works.extend(extract_rows(&doc, "tr.trHiddenResults", &language_re, |row| {
        hidden_author(row, &id_noise_re)
    })?);
    Ok(works)
}

fn extract_rows(
    doc: &Html,
    row_selector: &str,
    language_re: &Regex,
    author_of: impl Fn(&ElementRef) -> String,
) -> Result<Vec<Work>> {
    let rows = selector(row_selector)?;
    let anchor = selector("a.aResultsHeader")?;

    let mut works = Vec::new();
    for row in doc.select(&rows) {
        let Some(link) = row.select(&anchor).next() else {
            continue;
        };
        let Some(work_id) = link.value().attr("href").and_then(document_id) else {
            continue;
        };

        works.push(Work {
            language: language_of(&link, language_re),
            author: author_of(&row),
            title: link.text().collect::<String>().trim().to_string(),
            work_id,
        });
    }
    Ok(works)
}

/// Pull the percent-decoded document id out of an anchor href.
fn document_id(href: &str) -> Option<String> {
    let encoded = href.split("doc=").nth(1)?;
    Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
}

/// The language is named in the first text run following the anchor,
/// e.g. `<a ...>Aeneid</a> (Latin)`.
fn language_of(link: &ElementRef, language_re: &Regex) -> String {
    link.next_siblings()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .and_then(|text| language_re.find(text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Visible rows: first text line of the author cell (the rest is dates).
fn visible_author(row: &ElementRef) -> String {
    let Ok(author_cell) = selector("td.tdAuthor") else {
        return String::new();
    };
    row.select(&author_cell)
        .next()
        .and_then(|cell| {
            cell.text()
                .flat_map(str::lines)
                .map(str::trim)
                .find(|t| !t.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// Collapsed rows: the author hides in the row id, mixed with chunk numbers
/// (`Ovid,1 43` and the like), which get stripped out.
fn hidden_author(row: &ElementRef, id_noise_re: &Regex) -> String {
    row.value()
        .attr("id")
        .map(|id| id_noise_re.replace_all(id, "").trim().to_string())
        .unwrap_or_default()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e:?}"))
}

/// The distinct non-empty languages present in a catalog, sorted.
pub fn languages(works: &[Work]) -> BTreeSet<String> {
    works
        .iter()
        .filter(|w| !w.language.is_empty())
        .map(|w| w.language.clone())
        .collect()
}

/// The catalog entries for one language (case-insensitive).
pub fn filter_language<'a>(works: &'a [Work], language: &str) -> Vec<&'a Work> {
    works
        .iter()
        .filter(|w| w.language.eq_ignore_ascii_case(language))
        .collect()
}

/// Write a catalog CSV (`Language,Author,Title,Work ID`).
pub fn write_catalog(works: &[Work], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for work in works {
        writer.serialize(work)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Read a catalog CSV back into works.
pub fn read_catalog(path: &Path) -> Result<Vec<Work>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open catalog {}", path.display()))?;
    let mut works = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        let work: Work = row.with_context(|| {
            format!("malformed catalog row in {} (line {})", path.display(), i + 2)
        })?;
        works.push(work);
    }
    Ok(works)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION_PAGE: &str = r#"
        <html><body><table>
        <tr class="trResults">
          <td class="tdAuthor">Vergil
            70 BC - 19 BC</td>
          <td><a class="aResultsHeader"
               href="/hopper/text?doc=Perseus%3Atext%3A1999.02.0055">Aeneid</a>
            (Latin)
          </td>
        </tr>
        <tr class="trHiddenResults" id="Ovid,1 43">
          <td><a class="aResultsHeader"
               href="/hopper/text?doc=Perseus%3Atext%3A1999.02.0068">Amores</a>
            (Latin)</td>
        </tr>
        <tr class="trResults">
          <td class="tdAuthor">Homer</td>
          <td><a class="aResultsHeader"
               href="/hopper/text?doc=Perseus%3Atext%3A1999.01.0133">Iliad</a>
            (Greek)</td>
        </tr>
        <tr class="trResults">
          <td>No anchor in this row</td>
        </tr>
        </table></body></html>
    "#;

    #[test]
    fn test_parse_collection_extracts_visible_rows() {
        let works = parse_collection(COLLECTION_PAGE).unwrap();
        let aeneid = works.iter().find(|w| w.title == "Aeneid").unwrap();
        assert_eq!(aeneid.language, "Latin");
        assert_eq!(aeneid.author, "Vergil");
        assert_eq!(aeneid.work_id, "Perseus:text:1999.02.0055");
    }

    #[test]
    fn test_parse_collection_extracts_hidden_rows() {
        let works = parse_collection(COLLECTION_PAGE).unwrap();
        let amores = works.iter().find(|w| w.title == "Amores").unwrap();
        // Chunk numbers in the row id are stripped from the author.
        assert_eq!(amores.author, "Ovid");
        assert_eq!(amores.language, "Latin");
        assert_eq!(amores.work_id, "Perseus:text:1999.02.0068");
    }

    #[test]
    fn test_parse_collection_skips_rows_without_anchor() {
        let works = parse_collection(COLLECTION_PAGE).unwrap();
        assert_eq!(works.len(), 3);
    }

    #[test]
    fn test_author_ignores_date_line() {
        let works = parse_collection(COLLECTION_PAGE).unwrap();
        let aeneid = works.iter().find(|w| w.title == "Aeneid").unwrap();
        assert!(!aeneid.author.contains("BC"), "got: {}", aeneid.author);
    }

    #[test]
    fn test_missing_language_yields_empty_field() {
        let html = r#"
            <table><tr class="trResults">
              <td class="tdAuthor">Anon</td>
              <td><a class="aResultsHeader" href="?doc=Perseus%3Atext%3A1">Fragments</a></td>
            </tr></table>
        "#;
        let works = parse_collection(html).unwrap();
        assert_eq!(works.len(), 1);
        assert_eq!(works[0].language, "");
    }

    #[test]
    fn test_href_without_doc_param_is_skipped() {
        let html = r#"
            <table><tr class="trResults">
              <td class="tdAuthor">Anon</td>
              <td><a class="aResultsHeader" href="/hopper/help">Help</a> (Latin)</td>
            </tr></table>
        "#;
        let works = parse_collection(html).unwrap();
        assert!(works.is_empty());
    }

    #[test]
    fn test_languages_and_filter() {
        let works = parse_collection(COLLECTION_PAGE).unwrap();
        let langs = languages(&works);
        assert_eq!(
            langs.iter().collect::<Vec<_>>(),
            ["Greek", "Latin"]
        );

        let latin = filter_language(&works, "latin");
        assert_eq!(latin.len(), 2);
        let greek = filter_language(&works, "Greek");
        assert_eq!(greek.len(), 1);
        assert_eq!(greek[0].title, "Iliad");
    }

    #[test]
    fn test_catalog_round_trip_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works.csv");

        let works = parse_collection(COLLECTION_PAGE).unwrap();
        write_catalog(&works, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(
            text.starts_with("Language,Author,Title,Work ID\n"),
            "got: {text}"
        );

        let back = read_catalog(&path).unwrap();
        assert_eq!(back, works);
    }

    #[test]
    fn test_read_catalog_reports_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works.csv");
        std::fs::write(&path, "Language,Author,Title,Work ID\nLatin,Vergil\n").unwrap();

        let err = read_catalog(&path).unwrap_err();
        assert!(format!("{err}").contains("line 2"), "got: {err}");
    }
}
