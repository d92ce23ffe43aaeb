use crate::config::ReportConfig;
use crate::data::dataset::Dataset;
use crate::data::{ColumnKind, Summary};
use crate::report::chart;
use crate::{FieldfolioError, Result};
use printpdf::font::BuiltinFont;
use printpdf::matrix::TextMatrix;
use printpdf::ops::Op;
use printpdf::text::TextItem;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, Rgb, XObjectId};
use std::path::Path;
use tracing::warn;

/// Cells are truncated at this many characters with an ellipsis marker
/// so long free-text answers cannot overflow the table layout.
pub const MAX_CELL_CHARS: usize = 24;

/// Widest table the page can carry legibly; further columns are elided
/// with a note.
pub const MAX_TABLE_COLS: usize = 8;

const MARGIN_PT: f32 = 42.0;
const TITLE_SIZE: f32 = 24.0;
const SECTION_SIZE: f32 = 16.0;
const SUBSECTION_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;
const LINE_SPACING: f32 = 1.4;

/// What came out of a report run: degradation (failed charts) is
/// reported here rather than failing the whole document.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub pages: usize,
    pub charts_rendered: usize,
    pub chart_warnings: Vec<String>,
}

/// Assemble the report document: title, summary, charts, paginated data
/// table, in that order. The file is written to a temporary path next to
/// the destination and swapped in atomically on success.
pub fn generate(
    dataset: &Dataset,
    summary: &Summary,
    config: &ReportConfig,
    output: &Path,
) -> Result<ReportOutcome> {
    let mut doc = Assembler::new(config);

    doc.title(&config.title);
    doc.info_line(&format!(
        "Generated on {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    doc.vspace(10.0);

    if config.include_summary {
        write_summary_section(&mut doc, summary);
    }

    let mut charts_rendered = 0usize;
    let mut chart_warnings = Vec::new();
    if config.include_charts && !config.charts.is_empty() {
        doc.section("Data Visualizations");
        for spec in &config.charts {
            match chart::render(dataset, spec) {
                Ok(png) => {
                    doc.subsection(spec.label());
                    doc.image(&png)?;
                    charts_rendered += 1;
                }
                Err(e) => {
                    // Per-chart failure degrades the report, it never
                    // aborts it.
                    warn!("chart '{}' failed: {}", spec.label(), e);
                    doc.info_line(&format!("Chart '{}' could not be rendered: {}", spec.label(), e));
                    doc.vspace(6.0);
                    chart_warnings.push(format!("{}: {}", spec.label(), e));
                }
            }
        }
    }

    if config.include_data_table {
        write_data_table(&mut doc, dataset, config.max_table_rows);
    }

    let pages = doc.finish(output)?;
    Ok(ReportOutcome {
        pages,
        charts_rendered,
        chart_warnings,
    })
}

fn write_summary_section(doc: &mut Assembler, summary: &Summary) {
    doc.section("Summary Statistics");
    doc.body_line(&format!("Total records: {}", summary.row_count));
    doc.body_line(&format!("Fields: {}", summary.column_count));
    if let Some(range) = &summary.date_range {
        doc.body_line(&format!(
            "Date range ({}): {} to {}",
            range.column, range.start, range.end
        ));
    }
    doc.vspace(8.0);

    let numeric: Vec<_> = summary.numeric_columns().take(5).collect();
    if !numeric.is_empty() {
        doc.subsection("Numeric Fields");
        for col in numeric {
            if let Some(stats) = &col.numeric {
                doc.body_line(&format!(
                    "{}: mean={:.2}, range=[{:.2}, {:.2}], n={}",
                    col.name, stats.mean, stats.min, stats.max, col.non_null
                ));
            }
        }
        doc.vspace(8.0);
    }

    let categorical: Vec<_> = summary.categorical_columns().take(5).collect();
    if !categorical.is_empty() {
        doc.subsection("Categorical Fields");
        for col in categorical {
            if let Some(stats) = &col.categorical {
                let top: Vec<String> = stats
                    .top
                    .iter()
                    .map(|(value, count)| format!("{} ({})", value, count))
                    .collect();
                doc.body_line(&format!(
                    "{}: {} distinct; top: {}",
                    col.name,
                    stats.distinct,
                    top.join(", ")
                ));
            }
        }
        doc.vspace(8.0);
    }

    let other: Vec<String> = summary
        .columns
        .iter()
        .filter(|c| matches!(c.kind, ColumnKind::Temporal | ColumnKind::Text))
        .map(|c| format!("{} ({})", c.name, c.kind))
        .collect();
    if !other.is_empty() {
        doc.info_line(&format!("Other fields: {}", other.join(", ")));
        doc.vspace(8.0);
    }
}

fn write_data_table(doc: &mut Assembler, dataset: &Dataset, max_table_rows: usize) {
    doc.section("Data Table");

    if dataset.is_empty() {
        doc.body_line("No data available.");
        return;
    }

    let shown_cols = dataset.columns().len().min(MAX_TABLE_COLS);
    if shown_cols < dataset.columns().len() {
        doc.info_line(&format!(
            "Showing the first {} of {} columns",
            shown_cols,
            dataset.columns().len()
        ));
    }
    doc.vspace(4.0);

    let header: Vec<String> = dataset.columns()[..shown_cols]
        .iter()
        .map(|c| truncate_cell(c))
        .collect();

    for (i, page_rows) in paginate(dataset.rows(), max_table_rows).iter().enumerate() {
        if i > 0 {
            doc.new_page();
        }
        doc.table_row(&header, true);
        for row in *page_rows {
            let cells: Vec<String> = row[..shown_cols]
                .iter()
                .map(|v| truncate_cell(&v.to_string()))
                .collect();
            doc.table_row(&cells, false);
        }
    }
}

/// Split rows into table pages of at most `per_page` rows each.
pub(crate) fn paginate<T>(rows: &[T], per_page: usize) -> Vec<&[T]> {
    if rows.is_empty() {
        return Vec::new();
    }
    rows.chunks(per_page.max(1)).collect()
}

/// Truncate cell text past the fixed width with an ellipsis marker.
pub(crate) fn truncate_cell(text: &str) -> String {
    let mut chars = text.chars();
    let truncated: String = chars.by_ref().take(MAX_CELL_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", truncated)
    } else {
        truncated
    }
}

/// Linear page composer over printpdf's op stream. Keeps a cursor from
/// the top of the page and breaks to a new page when a block does not
/// fit.
struct Assembler {
    doc: PdfDocument,
    page_w_mm: Mm,
    page_h_mm: Mm,
    page_w: f32,
    page_h: f32,
    ops: Vec<Op>,
    cursor: f32,
    pages: usize,
}

impl Assembler {
    fn new(config: &ReportConfig) -> Self {
        let (w_mm, h_mm) = config.page_size.dimensions_mm();
        let page_w_mm = Mm(w_mm);
        let page_h_mm = Mm(h_mm);
        Assembler {
            doc: PdfDocument::new(&config.title),
            page_w: page_w_mm.into_pt().0,
            page_h: page_h_mm.into_pt().0,
            page_w_mm,
            page_h_mm,
            ops: Vec::new(),
            cursor: MARGIN_PT,
            pages: 0,
        }
    }

    fn content_width(&self) -> f32 {
        self.page_w - 2.0 * MARGIN_PT
    }

    fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.doc
            .pages
            .push(PdfPage::new(self.page_w_mm, self.page_h_mm, ops));
        self.pages += 1;
        self.cursor = MARGIN_PT;
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.cursor + needed > self.page_h - MARGIN_PT && !self.ops.is_empty() {
            self.new_page();
        }
    }

    fn vspace(&mut self, pt: f32) {
        self.cursor += pt;
    }

    fn title(&mut self, text: &str) {
        let width = approx_text_width(text, TITLE_SIZE);
        let x = MARGIN_PT.max((self.page_w - width) / 2.0);
        self.write_line(text, TITLE_SIZE, BuiltinFont::HelveticaBold, x, (0.18, 0.25, 0.34));
        self.vspace(8.0);
    }

    fn section(&mut self, text: &str) {
        self.ensure_room(SECTION_SIZE * LINE_SPACING + 20.0);
        self.vspace(6.0);
        self.write_line(text, SECTION_SIZE, BuiltinFont::HelveticaBold, MARGIN_PT, (0.11, 0.31, 0.45));
        self.vspace(6.0);
    }

    fn subsection(&mut self, text: &str) {
        self.ensure_room(SUBSECTION_SIZE * LINE_SPACING + 12.0);
        self.write_line(text, SUBSECTION_SIZE, BuiltinFont::HelveticaBold, MARGIN_PT, (0.16, 0.45, 0.65));
        self.vspace(3.0);
    }

    fn body_line(&mut self, text: &str) {
        self.ensure_room(BODY_SIZE * LINE_SPACING);
        self.write_line(text, BODY_SIZE, BuiltinFont::Helvetica, MARGIN_PT, (0.0, 0.0, 0.0));
    }

    fn info_line(&mut self, text: &str) {
        self.ensure_room(BODY_SIZE * LINE_SPACING);
        self.write_line(text, BODY_SIZE, BuiltinFont::HelveticaOblique, MARGIN_PT, (0.34, 0.4, 0.45));
    }

    fn table_row(&mut self, cells: &[String], header: bool) {
        self.ensure_room(TABLE_SIZE * LINE_SPACING);
        let font = if header {
            BuiltinFont::HelveticaBold
        } else {
            BuiltinFont::Helvetica
        };
        let col_width = self.content_width() / cells.len().max(1) as f32;
        // Per-column clip keeps narrow layouts from overlapping even
        // before the global character cap applies.
        let fit = ((col_width / (TABLE_SIZE * 0.55)) as usize).max(4);

        let baseline = self.page_h - (self.cursor + TABLE_SIZE * 0.8);
        let mut ops = vec![
            Op::StartTextSection,
            Op::SetFillColor {
                col: printpdf::color::Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)),
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(TABLE_SIZE),
                font,
            },
        ];
        for (i, cell) in cells.iter().enumerate() {
            let clipped: String = cell.chars().take(fit).collect();
            let x = MARGIN_PT + i as f32 * col_width;
            ops.push(Op::SetTextMatrix {
                matrix: TextMatrix::Translate(Pt(x), Pt(baseline)),
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(clipped)],
                font,
            });
        }
        ops.push(Op::EndTextSection);
        self.ops.extend(ops);
        self.cursor += TABLE_SIZE * LINE_SPACING;
    }

    fn write_line(&mut self, text: &str, size: f32, font: BuiltinFont, x: f32, rgb: (f32, f32, f32)) {
        let baseline = self.page_h - (self.cursor + size * 0.8);
        self.ops.extend([
            Op::StartTextSection,
            Op::SetFillColor {
                col: printpdf::color::Color::Rgb(Rgb::new(rgb.0, rgb.1, rgb.2, None)),
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font,
            },
            Op::SetTextMatrix {
                matrix: TextMatrix::Translate(Pt(x), Pt(baseline)),
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(text.to_string())],
                font,
            },
            Op::EndTextSection,
        ]);
        self.cursor += size * LINE_SPACING;
    }

    /// Embed a PNG chart scaled to the content width.
    fn image(&mut self, png: &[u8]) -> Result<()> {
        let mut warnings = Vec::new();
        let raw = printpdf::image::RawImage::decode_from_bytes(png, &mut warnings)
            .map_err(|e| FieldfolioError::Render(format!("failed to decode chart image: {}", e)))?;
        let (img_w, img_h) = (raw.width as f32, raw.height as f32);

        let xobj_id = XObjectId::new();
        self.doc
            .resources
            .xobjects
            .map
            .insert(xobj_id.clone(), XObject::Image(raw));

        let target_w = self.content_width().min(420.0);
        let scale = target_w / img_w;
        let target_h = img_h * scale;
        self.ensure_room(target_h + 10.0);

        let y = self.page_h - (self.cursor + target_h);
        self.ops.push(Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(MARGIN_PT)),
                translate_y: Some(Pt(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                rotate: None,
                dpi: Some(72.0),
            },
        });
        self.cursor += target_h + 10.0;
        Ok(())
    }

    /// Flush the last page and write the document atomically.
    fn finish(mut self, output: &Path) -> Result<usize> {
        if !self.ops.is_empty() || self.pages == 0 {
            self.new_page();
        }

        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| FieldfolioError::Render(format!("cannot create temporary file: {}", e)))?;

        let mut writer = std::io::BufWriter::new(tmp.as_file());
        let mut warnings = Vec::new();
        self.doc
            .save_writer(&mut writer, &PdfSaveOptions::default(), &mut warnings);
        drop(writer);

        let pages = self.pages;
        tmp.persist(output)
            .map_err(|e| FieldfolioError::Render(format!("cannot write {}: {}", output.display(), e.error)))?;
        Ok(pages)
    }
}

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}
