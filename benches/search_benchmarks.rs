use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use folio_engine::document::{Document, DocumentTree};
use folio_engine::replace::{replace, ReplaceMode, ReplaceRequest};
use folio_engine::search::{SearchOptions, SearchSession, TextSearcher};
use folio_engine::PositionMapper;

fn sample_markup(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "<p>Paragraph {} has a <b>cat</b> and a <i>category</i> of cats<footnote-ref id=\"{}\"/>.</p>",
                i,
                i + 1
            )
        })
        .collect()
}

fn find_all_matches(c: &mut Criterion) {
    let doc = Document::from_markup(&sample_markup(500)).unwrap();
    let text = PositionMapper::new(&doc).text().to_string();

    c.bench_function("find_all_case_insensitive", |b| {
        b.iter(|| TextSearcher::find_all(black_box(&text), "cat", &SearchOptions::default()))
    });

    let whole = SearchOptions::default().with_whole_words(true);
    c.bench_function("find_all_whole_words", |b| {
        b.iter(|| TextSearcher::find_all(black_box(&text), "cat", &whole))
    });
}

fn map_positions(c: &mut Criterion) {
    let doc = Document::from_markup(&sample_markup(500)).unwrap();

    c.bench_function("build_mapper", |b| b.iter(|| PositionMapper::new(black_box(&doc))));

    let mapper = PositionMapper::new(&doc);
    let len = mapper.len();
    c.bench_function("offset_to_position", |b| {
        b.iter(|| {
            for offset in (0..len).step_by(97) {
                black_box(mapper.offset_to_position(offset).unwrap());
            }
        })
    });
}

fn replace_pass(c: &mut Criterion) {
    let doc = Document::from_markup(&sample_markup(200)).unwrap();

    for (name, mode) in [
        ("replace_preserve_style", ReplaceMode::PreserveStyle),
        ("replace_reapply_style", ReplaceMode::ReapplyStyle),
    ] {
        let request = ReplaceRequest::new("cat", "dog").with_mode(mode);
        c.bench_function(name, |b| {
            b.iter_batched(
                || (doc.clone(), SearchSession::default()),
                |(mut doc, mut session)| {
                    replace(&mut doc, &request, &mut session).unwrap();
                    doc.content_size()
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, find_all_matches, map_positions, replace_pass);
criterion_main!(benches);
