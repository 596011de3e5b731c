//! PDF import through the editor, from bytes and from files.

use folio_engine::config::EngineConfig;
use folio_engine::import::{import_pdf, import_pdf_file, import_pdf_to_markup};
use folio_engine::pdf::PdfReader;
use folio_engine::{Editor, Error};
use std::io::Write;

/// Build a PDF with one page per content stream. The xref table is left
/// out on purpose; the reader locates objects by scanning.
fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let first_page = 4;
    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", first_page + 2 * i)).collect();

    let mut pdf = String::from("%PDF-1.5\n%\u{e2}\u{e3}\n");
    pdf.push_str("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    pdf.push_str(&format!(
        "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} /Resources << /Font << /F1 3 0 R /F2 3 0 R >> >> >>\nendobj\n",
        kids.join(" "),
        page_count
    ));
    pdf.push_str("3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n");
    for (i, content) in pages.iter().enumerate() {
        let page_id = first_page + 2 * i;
        pdf.push_str(&format!(
            "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R >>\nendobj\n",
            page_id,
            page_id + 1
        ));
        pdf.push_str(&format!(
            "{} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
            page_id + 1,
            content.len(),
            content
        ));
    }
    pdf.push_str("trailer\n<< /Root 1 0 R >>\nstartxref\n0\n%%EOF\n");
    pdf.into_bytes()
}

const TITLE_PAGE: &str = "BT /F1 22 Tf 72 720 Td (Annual Report) Tj ET \
                          BT /F1 16 Tf 72 680 Td (Summary) Tj ET \
                          BT /F2 11 Tf 72 650 Td [(Re) -20 (venue grew) -300 (again.)] TJ ET";
const BODY_PAGE: &str = "BT /F1 11 Tf 14 TL 72 720 Td (First line) Tj T* (Second line) Tj ET";

#[test]
fn test_multi_page_structure() {
    let pdf = build_pdf(&[TITLE_PAGE, BODY_PAGE]);
    let markup = import_pdf_to_markup(&pdf, &EngineConfig::default()).unwrap();
    assert_eq!(
        markup,
        "<h2>Annual Report</h2><h3>Summary</h3><p>Revenue grew again.</p>\
         <page-break/><p>First line</p><p>Second line</p>"
    );
}

#[test]
fn test_reader_sees_every_page() {
    let pdf = build_pdf(&[TITLE_PAGE, BODY_PAGE, BODY_PAGE]);
    let reader = PdfReader::open(&pdf).unwrap();
    assert_eq!(reader.page_count().unwrap(), 3);
}

#[test]
fn test_editor_import_replaces_document() {
    let mut editor = Editor::from_markup("<p>Old</p>").unwrap();
    let inferred = editor.import_pdf(&build_pdf(&[BODY_PAGE])).unwrap();
    assert_eq!(inferred.page_count, 1);
    assert_eq!(editor.to_markup(), "<p>First line</p><p>Second line</p>");
}

#[test]
fn test_editor_import_failure_keeps_document() {
    let mut editor = Editor::from_markup("<p>Old</p>").unwrap();
    let err = editor.import_pdf(b"%PDF-1.4\nnot really").unwrap_err();
    assert!(matches!(err, Error::ImportFailed(_)));
    assert!(err.is_import_error());
    assert_eq!(editor.to_markup(), "<p>Old</p>");
}

#[test]
fn test_import_from_tempfile() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&build_pdf(&[TITLE_PAGE])).unwrap();
    file.flush().unwrap();

    let doc = import_pdf_file(file.path(), &EngineConfig::default()).unwrap();
    assert_eq!(doc.blocks[0].text(), "Annual Report");
}

#[test]
fn test_size_gate_uses_config() {
    let pdf = build_pdf(&[BODY_PAGE]);
    let config = EngineConfig::default().with_max_import_bytes(pdf.len() - 1);
    let err = import_pdf(&pdf, &config).unwrap_err();
    assert!(matches!(err, Error::FileTooLarge { .. }));
    assert!(err.user_message().contains("too large"));

    let config = EngineConfig::default().with_max_import_bytes(pdf.len());
    assert!(import_pdf(&pdf, &config).is_ok());
}

#[test]
fn test_unsupported_format_message() {
    let err = import_pdf(b"\x89PNG\r\n\x1a\n", &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
    assert!(err.user_message().contains("not supported"));
}
