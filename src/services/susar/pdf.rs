// 报表 PDF 渲染：A4 横向网格表格，中文使用非嵌入的 STSong-Light。
use super::error::SusarError;
use super::report::ReportTable;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

const PAGE_WIDTH: i64 = 842;
const PAGE_HEIGHT: i64 = 595;
const MARGIN: i64 = 28;
const CELL_PADDING: i64 = 2;
const BODY_FONT_SIZE: i64 = 7;
/// 表头字号比正文大一号。
const HEADER_FONT_SIZE: i64 = BODY_FONT_SIZE + 1;
const LINE_GAP: i64 = 2;
const FONT_RESOURCE: &str = "F1";
const CJK_FONT: &str = "STSong-Light";
const CJK_ENCODING: &str = "UniGB-UCS2-H";
/// UniGB-UCS2-H 把 U+0020..U+007E 映射到 Adobe-GB1 的 CID 1..95（等比拉丁字形），
/// W 数组把这段 CID 的步进固定为该值，折行估算按同一宽度计算。
const ASCII_ADVANCE: i64 = 500;
const FIRST_ASCII_CID: i64 = 1;
const LAST_ASCII_CID: i64 = 95;
/// 列宽估算时单列的宽度区间（单位 em）。
const MIN_COLUMN_EM: f32 = 2.0;
const MAX_COLUMN_EM: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Header,
    Body,
}

impl RowKind {
    fn font_size(self) -> i64 {
        match self {
            RowKind::Header => HEADER_FONT_SIZE,
            RowKind::Body => BODY_FONT_SIZE,
        }
    }
}

/// 渲染报表；每个批次另起一页，行放不下时自动换页。
pub fn render_pdf(table: &ReportTable) -> Result<Vec<u8>, SusarError> {
    let widths = column_widths(table);
    let mut pages: Vec<Vec<Operation>> = Vec::new();
    let mut canvas = PageCanvas::new();

    if table.is_empty() {
        warn!("report has neither header nor data rows, rendering a blank page");
    }
    for (index, row) in table.header.iter().enumerate() {
        let kind = if index < table.shaded_header_rows {
            RowKind::Header
        } else {
            RowKind::Body
        };
        canvas.place_row(&mut pages, &widths, row, kind);
    }
    for (index, batch) in table.batches.iter().enumerate() {
        if index > 0 {
            pages.push(std::mem::replace(&mut canvas, PageCanvas::new()).finish());
        }
        for row in batch {
            canvas.place_row(&mut pages, &widths, row, RowKind::Body);
        }
    }
    pages.push(canvas.finish());

    let bytes = assemble(pages)?;
    debug!(
        "pdf rendered: header_rows={}, data_rows={}, batches={}, bytes={}",
        table.header.len(),
        table.data_row_count(),
        table.batches.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, SusarError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = add_cjk_font(&mut doc);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_RESOURCE => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn add_cjk_font(doc: &mut Document) -> ObjectId {
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => CJK_FONT,
        "Flags" => 6,
        "FontBBox" => vec![(-25).into(), (-254).into(), 1000.into(), 880.into()],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -120,
        "CapHeight" => 880,
        "StemV" => 93,
    });
    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => CJK_FONT,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("GB1"),
            "Supplement" => 2,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "W" => vec![
            FIRST_ASCII_CID.into(),
            LAST_ASCII_CID.into(),
            ASCII_ADVANCE.into(),
        ],
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => format!("{CJK_FONT}-{CJK_ENCODING}"),
        "Encoding" => CJK_ENCODING,
        "DescendantFonts" => vec![descendant_id.into()],
    })
}

/// 单页内容与当前书写位置。
struct PageCanvas {
    operations: Vec<Operation>,
    cursor_y: i64,
    rows: usize,
}

impl PageCanvas {
    fn new() -> Self {
        Self {
            operations: vec![
                Operation::new("w", vec![Object::Real(0.5)]),
                Operation::new("G", vec![0.into()]),
            ],
            cursor_y: PAGE_HEIGHT - MARGIN,
            rows: 0,
        }
    }

    fn finish(self) -> Vec<Operation> {
        self.operations
    }

    fn place_row(
        &mut self,
        pages: &mut Vec<Vec<Operation>>,
        widths: &[i64],
        row: &[String],
        kind: RowKind,
    ) {
        if widths.is_empty() {
            return;
        }
        let font_size = kind.font_size();
        let line_height = font_size + LINE_GAP;
        let max_lines = ((PAGE_HEIGHT - 2 * MARGIN - 2 * CELL_PADDING) / line_height).max(1) as usize;
        let cells = widths
            .iter()
            .enumerate()
            .map(|(index, width)| {
                let text = row.get(index).map(String::as_str).unwrap_or("");
                let mut lines = wrap_text(text, width - 2 * CELL_PADDING, font_size);
                lines.truncate(max_lines);
                lines
            })
            .collect::<Vec<_>>();
        let line_count = cells.iter().map(Vec::len).max().unwrap_or(0).max(1) as i64;
        let height = line_count * line_height + 2 * CELL_PADDING;

        if self.rows > 0 && self.cursor_y - height < MARGIN {
            pages.push(std::mem::replace(self, PageCanvas::new()).finish());
        }

        let top = self.cursor_y;
        let bottom = top - height;
        if kind == RowKind::Header {
            let total: i64 = widths.iter().sum();
            self.operations.extend([
                Operation::new("q", vec![]),
                Operation::new("g", vec![Object::Real(0.85)]),
                Operation::new(
                    "re",
                    vec![MARGIN.into(), bottom.into(), total.into(), height.into()],
                ),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ]);
        }

        let mut x = MARGIN;
        for (width, lines) in widths.iter().zip(&cells) {
            self.operations.extend([
                Operation::new(
                    "re",
                    vec![x.into(), bottom.into(), (*width).into(), height.into()],
                ),
                Operation::new("S", vec![]),
            ]);
            for (index, line) in lines.iter().enumerate() {
                let baseline = top - CELL_PADDING - font_size - index as i64 * line_height;
                self.operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![FONT_RESOURCE.into(), font_size.into()]),
                    Operation::new("Td", vec![(x + CELL_PADDING).into(), baseline.into()]),
                    Operation::new("Tj", vec![encode_text(line)]),
                    Operation::new("ET", vec![]),
                ]);
            }
            x += width;
        }

        self.cursor_y = bottom;
        self.rows += 1;
    }
}

/// 按内容宽度分配列宽，总宽为页面去掉左右边距。
fn column_widths(table: &ReportTable) -> Vec<i64> {
    if table.column_count == 0 {
        return Vec::new();
    }
    let mut weights = vec![MIN_COLUMN_EM; table.column_count];
    for row in table.header.iter().chain(table.batches.iter().flatten()) {
        for (weight, cell) in weights.iter_mut().zip(row) {
            let em = text_width_em(cell).min(MAX_COLUMN_EM);
            if em > *weight {
                *weight = em;
            }
        }
    }
    let available = PAGE_WIDTH - 2 * MARGIN;
    let total_weight: f32 = weights.iter().sum();
    let mut widths = weights
        .iter()
        .map(|weight| ((available as f32) * weight / total_weight).floor() as i64)
        .collect::<Vec<_>>();
    let used: i64 = widths.iter().sum();
    if let Some(last) = widths.last_mut() {
        *last += available - used;
    }
    widths
}

/// 非 ASCII 字符按 DW（1000）计。
fn char_width_em(ch: char) -> f32 {
    if ch.is_ascii() {
        ASCII_ADVANCE as f32 / 1000.0
    } else {
        1.0
    }
}

fn text_width_em(text: &str) -> f32 {
    text.chars().map(char_width_em).sum()
}

/// 按字符贪心折行；显式换行符保留。
fn wrap_text(text: &str, max_width: i64, font_size: i64) -> Vec<String> {
    let limit_em = (max_width.max(1) as f32) / font_size as f32;
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_em = 0.0f32;
        for ch in paragraph.chars().filter(|ch| *ch != '\r') {
            let em = char_width_em(ch);
            if !line.is_empty() && line_em + em > limit_em {
                lines.push(std::mem::take(&mut line));
                line_em = 0.0;
            }
            line.push(ch);
            line_em += em;
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// UCS-2 大端十六进制串；BMP 以外的字符以 `?` 代替。
fn encode_text(text: &str) -> Object {
    let mut bytes = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let code = u16::try_from(ch as u32).unwrap_or(b'?' as u16);
        bytes.extend_from_slice(&code.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).expect("parse pdf").get_pages().len()
    }

    #[test]
    fn each_batch_starts_a_new_page() {
        let table = ReportTable {
            column_count: 3,
            header: vec![row(&["试验药物：XX", "", ""]), row(&["病例号", "Study ID", "事件"])],
            shaded_header_rows: 1,
            batches: vec![
                vec![row(&["1", "P001", "肝功能异常"]), row(&["2", "P001", "皮疹"])],
                vec![row(&["3", "P001", "发热"])],
            ],
        };
        let bytes = render_pdf(&table).expect("render");
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 2);
    }

    #[test]
    fn overflowing_batch_spills_onto_more_pages() {
        let batch = (0..50)
            .map(|index| row(&[&format!("{index}"), &"长文本".repeat(12)]))
            .collect::<Vec<_>>();
        let table = ReportTable {
            column_count: 2,
            header: Vec::new(),
            shaded_header_rows: 0,
            batches: vec![batch],
        };
        // 每行 13pt，可用高度 539pt，一页放 41 行。
        let bytes = render_pdf(&table).expect("render");
        assert_eq!(page_count(&bytes), 2);
    }

    #[test]
    fn header_only_report_renders_one_page() {
        let table = ReportTable {
            column_count: 1,
            header: vec![row(&["Protocol"])],
            shaded_header_rows: 0,
            batches: Vec::new(),
        };
        let bytes = render_pdf(&table).expect("render");
        assert_eq!(page_count(&bytes), 1);
    }

    fn first_page_operators(bytes: &[u8], operator: &str) -> Vec<Operation> {
        let doc = Document::load_mem(bytes).expect("parse pdf");
        let page_id = *doc.get_pages().values().next().expect("first page");
        doc.get_and_decode_page_content(page_id)
            .expect("page content")
            .operations
            .into_iter()
            .filter(|op| op.operator == operator)
            .collect()
    }

    #[test]
    fn only_rows_above_the_boundary_are_shaded() {
        let table = ReportTable {
            column_count: 2,
            header: vec![
                row(&["试验药物：XX", ""]),
                row(&["传输数据区间", "2024Q1"]),
                row(&["病例号", "Study ID"]),
            ],
            shaded_header_rows: 2,
            batches: vec![vec![row(&["1", "P001"])]],
        };
        let bytes = render_pdf(&table).expect("render");
        assert_eq!(first_page_operators(&bytes, "f").len(), 2);

        let sizes = first_page_operators(&bytes, "Tf")
            .into_iter()
            .filter_map(|op| op.operands.get(1).and_then(|size| size.as_i64().ok()))
            .collect::<Vec<_>>();
        assert_eq!(
            sizes.iter().filter(|size| **size == HEADER_FONT_SIZE).count(),
            3
        );
        assert_eq!(sizes.iter().filter(|size| **size == BODY_FONT_SIZE).count(), 4);
    }

    #[test]
    fn ascii_advance_matches_the_wrap_estimate() {
        let bytes = render_pdf(&ReportTable {
            column_count: 1,
            header: vec![row(&["Protocol"])],
            shaded_header_rows: 0,
            batches: Vec::new(),
        })
        .expect("render");
        let doc = Document::load_mem(&bytes).expect("parse pdf");
        let widths = doc
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .find(|dict| {
                dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"CIDFontType0"[..])
            })
            .and_then(|dict| dict.get(b"W").and_then(Object::as_array).ok().cloned())
            .expect("descendant font widths");
        let widths = widths
            .iter()
            .map(|value| value.as_i64().expect("integer width"))
            .collect::<Vec<_>>();
        assert_eq!(widths, vec![1, 95, 500]);
        assert_eq!(char_width_em('A') * 1000.0, widths[2] as f32);
        assert_eq!(char_width_em('中'), 1.0);

        // 可打印 ASCII 的码位与 CID 一一对应：U+0020 -> 1，U+007E -> 95。
        let Object::String(codes, _) = encode_text(" ~") else {
            panic!("expected hex string");
        };
        assert_eq!(u16::from_be_bytes([codes[0], codes[1]]) as i64 - 0x1F, widths[0]);
        assert_eq!(u16::from_be_bytes([codes[2], codes[3]]) as i64 - 0x1F, widths[1]);
    }

    #[test]
    fn wrapping_respects_width_and_newlines() {
        let lines = wrap_text("abcdefgh\n中文", 14, 7);
        assert_eq!(lines, vec!["abcd", "efgh", "中文"]);
        assert!(wrap_text("", 50, 7).is_empty());
    }

    #[test]
    fn text_is_encoded_as_ucs2() {
        let Object::String(bytes, StringFormat::Hexadecimal) = encode_text("A中😀") else {
            panic!("expected hex string");
        };
        assert_eq!(bytes, vec![0x00, 0x41, 0x4E, 0x2D, 0x00, 0x3F]);
    }

    #[test]
    fn column_widths_fill_the_printable_area() {
        let table = ReportTable {
            column_count: 4,
            header: vec![row(&["a", "bbbbbbbbbbbbbbbb", "中文中文", ""])],
            shaded_header_rows: 1,
            batches: Vec::new(),
        };
        let widths = column_widths(&table);
        assert_eq!(widths.iter().sum::<i64>(), PAGE_WIDTH - 2 * MARGIN);
        assert!(widths[1] > widths[0]);
    }
}
