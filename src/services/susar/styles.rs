// 解析 xl/styles.xml，把 cellXfs 展开为独立的 CellStyle 列表。
// 主题色、索引色在此解析为 RGB，输出端只处理显式颜色。
use super::reader::{attr_value, local_name};
use super::sheet::{
    AlignmentStyle, BorderEdge, BorderStyle, CellStyle, FillStyle, FontStyle, NumberFormat, Rgb,
};
use anyhow::{anyhow, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Default)]
struct XfRecord {
    num_fmt_id: u32,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    border_id: Option<usize>,
    alignment: Option<AlignmentStyle>,
}

/// 主题色序号顺序：0=lt1, 1=dk1, 2=lt2, 3=dk2, 4..9=accent1..6, 10=hlink, 11=folHlink。
/// 工作簿缺少 theme1.xml 时使用 Office 默认配色。
pub(crate) const DEFAULT_THEME_COLORS: [Rgb; 12] = [
    0xFFFFFF, 0x000000, 0xEEECE1, 0x1F497D, 0x4F81BD, 0xC0504D, 0x9BBB59, 0x8064A2, 0x4BACC6,
    0xF79646, 0x0000FF, 0x800080,
];

/// SpreadsheetML 默认 indexedColors（0..=63）。
const DEFAULT_INDEXED_COLORS: [Rgb; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, 0x000000,
    0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, 0x800000, 0x008000,
    0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, 0x9999FF, 0x993366, 0xFFFFCC,
    0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, 0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF,
    0x800080, 0x800000, 0x008080, 0x0000FF, 0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF,
    0xFF99CC, 0xCC99FF, 0xFFCC99, 0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600,
    0x666699, 0x969696, 0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399,
    0x333333,
];

#[derive(Debug, Clone)]
struct ColorPalette {
    theme: Vec<Rgb>,
    indexed: Vec<Rgb>,
}

impl ColorPalette {
    fn theme(&self, index: usize, tint: f64) -> Option<Rgb> {
        self.theme.get(index).map(|rgb| apply_tint(*rgb, tint))
    }

    /// 64/65 为系统前景/背景色，按自动色处理。
    fn indexed(&self, index: usize) -> Option<Rgb> {
        self.indexed.get(index).copied()
    }
}

struct StylesParser {
    palette: ColorPalette,
    section: Option<Section>,
    num_fmts: HashMap<u32, String>,
    fonts: Vec<FontStyle>,
    fills: Vec<FillStyle>,
    borders: Vec<BorderStyle>,
    xfs: Vec<XfRecord>,
    font: Option<FontStyle>,
    fill: Option<FillStyle>,
    border: Option<BorderStyle>,
    edge: Option<Edge>,
    xf: Option<XfRecord>,
}

/// `theme` 为 [`parse_theme_colors`] 的结果，按主题色序号排列。
pub(crate) fn parse_styles(data: &[u8], theme: &[Rgb]) -> Result<Vec<CellStyle>> {
    // <colors> 位于 cellXfs 之后，先取出自定义索引色。
    let indexed = read_indexed_colors(data)?;
    let mut reader = XmlReader::from_reader(Cursor::new(data));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut parser = StylesParser::new(ColorPalette {
        theme: theme.to_vec(),
        indexed: indexed.unwrap_or_else(|| DEFAULT_INDEXED_COLORS.to_vec()),
    });
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => parser.open(&reader, e),
            Ok(Event::Empty(ref e)) => {
                parser.open(&reader, e);
                parser.close(local_name(e.name().as_ref()));
            }
            Ok(Event::End(ref e)) => parser.close(local_name(e.name().as_ref())),
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!(format!("styles parse failed: {err}"))),
            _ => {}
        }
    }
    Ok(parser.finish())
}

impl StylesParser {
    fn new(palette: ColorPalette) -> Self {
        Self {
            palette,
            section: None,
            num_fmts: HashMap::new(),
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            xfs: Vec::new(),
            font: None,
            fill: None,
            border: None,
            edge: None,
            xf: None,
        }
    }

    fn open<B: std::io::BufRead>(&mut self, reader: &XmlReader<B>, e: &BytesStart) {
        let name = local_name(e.name().as_ref()).to_vec();
        match name.as_slice() {
            b"numFmt" => {
                let id = attr_value(reader, e, b"numFmtId").and_then(|v| v.parse::<u32>().ok());
                let code = attr_value(reader, e, b"formatCode");
                if let (Some(id), Some(code)) = (id, code) {
                    self.num_fmts.insert(id, code);
                }
            }
            b"fonts" => self.section = Some(Section::Fonts),
            b"fills" => self.section = Some(Section::Fills),
            b"borders" => self.section = Some(Section::Borders),
            b"cellXfs" => self.section = Some(Section::CellXfs),
            b"cellStyleXfs" | b"dxfs" | b"cellStyles" => self.section = Some(Section::None),
            _ => self.open_in_section(reader, e, &name),
        }
    }

    fn open_in_section<B: std::io::BufRead>(
        &mut self,
        reader: &XmlReader<B>,
        e: &BytesStart,
        name: &[u8],
    ) {
        match (self.section, name) {
            (Some(Section::Fonts), b"font") => self.font = Some(FontStyle::default()),
            (Some(Section::Fonts), _) => {
                let Some(font) = self.font.as_mut() else {
                    return;
                };
                match name {
                    b"b" => font.bold = flag_value(reader, e),
                    b"i" => font.italic = flag_value(reader, e),
                    b"strike" => font.strike = flag_value(reader, e),
                    b"u" => {
                        font.underline = attr_value(reader, e, b"val")
                            .map(|value| value != "none")
                            .unwrap_or(true);
                    }
                    b"sz" => {
                        font.size = attr_value(reader, e, b"val").and_then(|v| v.parse().ok());
                    }
                    b"name" | b"rFont" => font.name = attr_value(reader, e, b"val"),
                    b"color" => font.color = color_value(reader, e, &self.palette),
                    _ => {}
                }
            }
            (Some(Section::Fills), b"fill") => self.fill = Some(FillStyle::default()),
            (Some(Section::Fills), _) => {
                let Some(fill) = self.fill.as_mut() else {
                    return;
                };
                match name {
                    b"patternFill" => {
                        fill.pattern = attr_value(reader, e, b"patternType").unwrap_or_default();
                    }
                    b"fgColor" => fill.fg_color = color_value(reader, e, &self.palette),
                    b"bgColor" => fill.bg_color = color_value(reader, e, &self.palette),
                    _ => {}
                }
            }
            (Some(Section::Borders), b"border") => self.border = Some(BorderStyle::default()),
            (Some(Section::Borders), _) => self.open_border_part(reader, e, name),
            (Some(Section::CellXfs), b"xf") => {
                let id = |key: &[u8]| {
                    attr_value(reader, e, key).and_then(|value| value.parse::<usize>().ok())
                };
                self.xf = Some(XfRecord {
                    num_fmt_id: attr_value(reader, e, b"numFmtId")
                        .and_then(|value| value.parse::<u32>().ok())
                        .unwrap_or(0),
                    font_id: id(b"fontId"),
                    fill_id: id(b"fillId"),
                    border_id: id(b"borderId"),
                    alignment: None,
                });
            }
            (Some(Section::CellXfs), b"alignment") => {
                if let Some(xf) = self.xf.as_mut() {
                    xf.alignment = Some(AlignmentStyle {
                        horizontal: attr_value(reader, e, b"horizontal"),
                        vertical: attr_value(reader, e, b"vertical"),
                        wrap_text: attr_value(reader, e, b"wrapText")
                            .map(|value| value == "1" || value == "true")
                            .unwrap_or(false),
                    });
                }
            }
            _ => {}
        }
    }

    fn open_border_part<B: std::io::BufRead>(
        &mut self,
        reader: &XmlReader<B>,
        e: &BytesStart,
        name: &[u8],
    ) {
        let Some(border) = self.border.as_mut() else {
            return;
        };
        let edge = match name {
            b"left" | b"start" => Some(Edge::Left),
            b"right" | b"end" => Some(Edge::Right),
            b"top" => Some(Edge::Top),
            b"bottom" => Some(Edge::Bottom),
            _ => None,
        };
        if let Some(edge) = edge {
            self.edge = Some(edge);
            // 没有 style 属性的边即无边框。
            if let Some(style) = attr_value(reader, e, b"style").filter(|s| s != "none") {
                *edge_slot(border, edge) = Some(BorderEdge { style, color: None });
            }
            return;
        }
        if name == b"color" {
            if let Some(edge) = self.edge {
                if let Some(slot) = edge_slot(border, edge).as_mut() {
                    slot.color = color_value(reader, e, &self.palette);
                }
            }
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"fonts" | b"fills" | b"borders" | b"cellXfs" | b"cellStyleXfs" | b"dxfs"
            | b"cellStyles" => self.section = None,
            b"font" if self.section == Some(Section::Fonts) => {
                if let Some(font) = self.font.take() {
                    self.fonts.push(font);
                }
            }
            b"fill" if self.section == Some(Section::Fills) => {
                if let Some(fill) = self.fill.take() {
                    self.fills.push(fill);
                }
            }
            b"border" if self.section == Some(Section::Borders) => {
                if let Some(border) = self.border.take() {
                    self.borders.push(border);
                }
                self.edge = None;
            }
            b"left" | b"start" | b"right" | b"end" | b"top" | b"bottom" => self.edge = None,
            b"xf" if self.section == Some(Section::CellXfs) => {
                if let Some(xf) = self.xf.take() {
                    self.xfs.push(xf);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Vec<CellStyle> {
        self.xfs
            .iter()
            .map(|xf| CellStyle {
                font: xf.font_id.and_then(|id| self.fonts.get(id).cloned()),
                fill: xf
                    .fill_id
                    .and_then(|id| self.fills.get(id))
                    .filter(|fill| !fill.pattern.is_empty() && fill.pattern != "none")
                    .cloned(),
                border: xf
                    .border_id
                    .and_then(|id| self.borders.get(id))
                    .filter(|border| !border.is_empty())
                    .cloned(),
                alignment: xf.alignment.clone(),
                number_format: number_format(xf.num_fmt_id, &self.num_fmts),
            })
            .collect()
    }
}

fn edge_slot(border: &mut BorderStyle, edge: Edge) -> &mut Option<BorderEdge> {
    match edge {
        Edge::Left => &mut border.left,
        Edge::Right => &mut border.right,
        Edge::Top => &mut border.top,
        Edge::Bottom => &mut border.bottom,
    }
}

fn number_format(id: u32, custom: &HashMap<u32, String>) -> Option<NumberFormat> {
    if id == 0 {
        return None;
    }
    if let Some(code) = custom.get(&id) {
        return Some(NumberFormat::Custom(code.clone()));
    }
    u8::try_from(id).ok().map(NumberFormat::Builtin)
}

/// `<b/>` 与 `<b val="1"/>` 为真，`val="0"`/`"false"` 为假。
fn flag_value<B: std::io::BufRead>(reader: &XmlReader<B>, e: &BytesStart) -> bool {
    attr_value(reader, e, b"val")
        .map(|value| value != "0" && value != "false")
        .unwrap_or(true)
}

/// 依次识别 rgb、indexed、theme(+tint)；auto 视为缺失。
fn color_value<B: std::io::BufRead>(
    reader: &XmlReader<B>,
    e: &BytesStart,
    palette: &ColorPalette,
) -> Option<Rgb> {
    if let Some(raw) = attr_value(reader, e, b"rgb") {
        return parse_argb(&raw);
    }
    if let Some(index) = attr_value(reader, e, b"indexed") {
        return palette.indexed(index.trim().parse().ok()?);
    }
    let theme = attr_value(reader, e, b"theme")?.trim().parse::<usize>().ok()?;
    let tint = attr_value(reader, e, b"tint")
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    palette.theme(theme, tint)
}

/// tint < 0 按比例变暗，tint > 0 向白色混合，逐通道计算。
fn apply_tint(rgb: Rgb, tint: f64) -> Rgb {
    if tint == 0.0 || !tint.is_finite() {
        return rgb;
    }
    let tint = tint.clamp(-1.0, 1.0);
    let channel = |shift: u32| {
        let value = ((rgb >> shift) & 0xFF) as f64;
        let adjusted = if tint < 0.0 {
            value * (1.0 + tint)
        } else {
            value * (1.0 - tint) + 255.0 * tint
        };
        (adjusted.round().clamp(0.0, 255.0) as u32) << shift
    };
    channel(16) | channel(8) | channel(0)
}

fn read_indexed_colors(data: &[u8]) -> Result<Option<Vec<Rgb>>> {
    let mut reader = XmlReader::from_reader(Cursor::new(data));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut in_indexed = false;
    let mut colors: Option<Vec<Rgb>> = None;
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"indexedColors" => {
                in_indexed = true;
                colors = Some(Vec::new());
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if in_indexed && local_name(e.name().as_ref()) == b"rgbColor" =>
            {
                if let Some(colors) = colors.as_mut() {
                    let rgb = attr_value(&reader, e, b"rgb").and_then(|raw| parse_argb(&raw));
                    colors.push(rgb.unwrap_or(0));
                }
            }
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"indexedColors" => {
                in_indexed = false;
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!(format!("styles parse failed: {err}"))),
            _ => {}
        }
    }
    Ok(colors.filter(|colors| !colors.is_empty()))
}

/// 读取 theme1.xml 的 clrScheme；缺失的槽位保留默认配色。
pub(crate) fn parse_theme_colors(data: &[u8]) -> Result<Vec<Rgb>> {
    let mut reader = XmlReader::from_reader(Cursor::new(data));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut colors = DEFAULT_THEME_COLORS.to_vec();
    let mut in_scheme = false;
    let mut slot: Option<usize> = None;
    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let is_empty = matches!(event, Ok(Event::Empty(_)));
                let qname = e.name();
                let name = local_name(qname.as_ref());
                if name == b"clrScheme" {
                    in_scheme = !is_empty;
                } else if in_scheme && slot.is_none() {
                    if !is_empty {
                        slot = theme_slot(name);
                    }
                } else if let Some(index) = slot {
                    let value = match name {
                        b"srgbClr" => attr_value(&reader, e, b"val"),
                        b"sysClr" => attr_value(&reader, e, b"lastClr"),
                        _ => None,
                    };
                    if let Some(rgb) = value.and_then(|raw| parse_argb(&raw)) {
                        colors[index] = rgb;
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let qname = e.name();
                let name = local_name(qname.as_ref());
                if name == b"clrScheme" {
                    in_scheme = false;
                } else if slot.is_some() && theme_slot(name) == slot {
                    slot = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!(format!("theme parse failed: {err}"))),
            _ => {}
        }
    }
    Ok(colors)
}

fn theme_slot(name: &[u8]) -> Option<usize> {
    match name {
        b"lt1" => Some(0),
        b"dk1" => Some(1),
        b"lt2" => Some(2),
        b"dk2" => Some(3),
        b"accent1" => Some(4),
        b"accent2" => Some(5),
        b"accent3" => Some(6),
        b"accent4" => Some(7),
        b"accent5" => Some(8),
        b"accent6" => Some(9),
        b"hlink" => Some(10),
        b"folHlink" => Some(11),
        _ => None,
    }
}

pub(crate) fn parse_argb(raw: &str) -> Option<Rgb> {
    let hex = raw.trim().trim_start_matches('#');
    let rgb = match hex.len() {
        8 => hex.get(2..)?,
        6 => hex,
        _ => return None,
    };
    u32::from_str_radix(rgb, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy/m/d"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><u/><sz val="14"/><color rgb="FFFF0000"/><name val="宋体"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color rgb="FF000000"/></left><right style="medium"/><top/><bottom style="thin"><color indexed="64"/></bottom><diagonal/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" fillId="2" borderId="1" xfId="0" applyAlignment="1"><alignment horizontal="center" vertical="center" wrapText="1"/></xf>
    <xf numFmtId="14" fontId="9" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn cell_xfs_resolve_to_styles() {
        let styles = parse_styles(STYLES.as_bytes(), &DEFAULT_THEME_COLORS).expect("parse styles");
        assert_eq!(styles.len(), 3);

        let plain = &styles[0];
        assert_eq!(
            plain.font.as_ref().and_then(|font| font.name.as_deref()),
            Some("Calibri")
        );
        assert!(plain.fill.is_none());
        assert!(plain.border.is_none());
        assert!(plain.alignment.is_none());
        assert!(plain.number_format.is_none());

        let rich = &styles[1];
        let font = rich.font.as_ref().expect("font");
        assert!(font.bold);
        assert!(!font.italic);
        assert!(font.underline);
        assert_eq!(font.size, Some(14.0));
        assert_eq!(font.color, Some(0xFF0000));
        assert_eq!(font.name.as_deref(), Some("宋体"));
        let fill = rich.fill.as_ref().expect("fill");
        assert_eq!(fill.pattern, "solid");
        assert_eq!(fill.fg_color, Some(0xFFFF00));
        assert_eq!(fill.bg_color, None);
        let border = rich.border.as_ref().expect("border");
        assert_eq!(
            border.left,
            Some(BorderEdge {
                style: "thin".to_string(),
                color: Some(0),
            })
        );
        assert_eq!(border.right.as_ref().map(|e| e.style.as_str()), Some("medium"));
        assert!(border.top.is_none());
        assert_eq!(border.bottom.as_ref().and_then(|e| e.color), None);
        let alignment = rich.alignment.as_ref().expect("alignment");
        assert_eq!(alignment.horizontal.as_deref(), Some("center"));
        assert!(alignment.wrap_text);
        assert_eq!(
            rich.number_format,
            Some(NumberFormat::Custom("yyyy/m/d".to_string()))
        );

        // 引用不存在的字体时该属性缺失，不报错。
        let dangling = &styles[2];
        assert!(dangling.font.is_none());
        assert_eq!(dangling.number_format, Some(NumberFormat::Builtin(14)));
    }

    fn styles_with_fills(fills: &str, colors: &str) -> String {
        format!(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1"><font><sz val="11"/></font></fonts>
  <fills>{fills}</fills>
  <borders count="1"><border/></borders>
  <cellXfs>
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="0" fillId="1" borderId="0"/>
    <xf numFmtId="0" fontId="0" fillId="2" borderId="0"/>
  </cellXfs>
  {colors}
</styleSheet>"#
        )
    }

    fn fill_color(style: &CellStyle) -> Option<Rgb> {
        style.fill.as_ref().and_then(|fill| fill.fg_color)
    }

    #[test]
    fn theme_fills_resolve_against_the_palette() {
        let xml = styles_with_fills(
            r#"<fill><patternFill patternType="solid"><fgColor theme="4"/></patternFill></fill>
               <fill><patternFill patternType="solid"><fgColor theme="0" tint="-0.499984740745262"/></patternFill></fill>
               <fill><patternFill patternType="solid"><fgColor theme="1" tint="0.5"/></patternFill></fill>"#,
            "",
        );
        let styles = parse_styles(xml.as_bytes(), &DEFAULT_THEME_COLORS).expect("parse styles");
        assert_eq!(fill_color(&styles[0]), Some(0x4F81BD));
        assert_eq!(fill_color(&styles[1]), Some(0x808080));
        assert_eq!(fill_color(&styles[2]), Some(0x808080));

        let mut theme = DEFAULT_THEME_COLORS.to_vec();
        theme[4] = 0x112233;
        let styles = parse_styles(xml.as_bytes(), &theme).expect("parse styles");
        assert_eq!(fill_color(&styles[0]), Some(0x112233));
    }

    #[test]
    fn indexed_fills_use_the_default_or_custom_palette() {
        let fills = r#"<fill><patternFill patternType="solid"><fgColor indexed="10"/></patternFill></fill>
               <fill><patternFill patternType="solid"><fgColor indexed="22"/></patternFill></fill>
               <fill><patternFill patternType="solid"><fgColor indexed="64"/></patternFill></fill>"#;
        let styles = parse_styles(styles_with_fills(fills, "").as_bytes(), &DEFAULT_THEME_COLORS)
            .expect("parse styles");
        assert_eq!(fill_color(&styles[0]), Some(0xFF0000));
        assert_eq!(fill_color(&styles[1]), Some(0xC0C0C0));
        assert_eq!(fill_color(&styles[2]), None);

        let colors = r#"<colors><indexedColors>
            <rgbColor rgb="FF000000"/><rgbColor rgb="FFFFFFFF"/><rgbColor rgb="FFFF0000"/>
            <rgbColor rgb="FF00FF00"/><rgbColor rgb="FF0000FF"/><rgbColor rgb="FFFFFF00"/>
            <rgbColor rgb="FFFF00FF"/><rgbColor rgb="FF00FFFF"/><rgbColor rgb="FF000000"/>
            <rgbColor rgb="FFFFFFFF"/><rgbColor rgb="FFABCDEF"/>
        </indexedColors></colors>"#;
        let styles = parse_styles(
            styles_with_fills(fills, colors).as_bytes(),
            &DEFAULT_THEME_COLORS,
        )
        .expect("parse styles");
        assert_eq!(fill_color(&styles[0]), Some(0xABCDEF));
        assert_eq!(fill_color(&styles[1]), None);
    }

    #[test]
    fn tint_darkens_and_lightens_per_channel() {
        assert_eq!(apply_tint(0x0000FF, 0.0), 0x0000FF);
        assert_eq!(apply_tint(0x0000FF, -0.5), 0x000080);
        assert_eq!(apply_tint(0x0000FF, 0.5), 0x8080FF);
        assert_eq!(apply_tint(0x0000FF, 1.0), 0xFFFFFF);
        assert_eq!(apply_tint(0x0000FF, -3.0), 0x000000);
    }

    #[test]
    fn theme_part_overrides_scheme_slots() {
        let theme = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <a:themeElements>
    <a:clrScheme name="Custom">
      <a:dk1><a:sysClr val="windowText" lastClr="111111"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="EEEEEE"/></a:lt1>
      <a:dk2><a:srgbClr val="222222"/></a:dk2>
      <a:accent1><a:srgbClr val="010203"/></a:accent1>
      <a:folHlink><a:srgbClr val="161718"/></a:folHlink>
    </a:clrScheme>
    <a:fmtScheme><a:fillStyleLst><a:solidFill><a:srgbClr val="999999"/></a:solidFill></a:fillStyleLst></a:fmtScheme>
  </a:themeElements>
</a:theme>"#;
        let colors = parse_theme_colors(theme.as_bytes()).expect("parse theme");
        assert_eq!(colors.len(), 12);
        assert_eq!(colors[0], 0xEEEEEE);
        assert_eq!(colors[1], 0x111111);
        assert_eq!(colors[2], 0xEEECE1);
        assert_eq!(colors[3], 0x222222);
        assert_eq!(colors[4], 0x010203);
        assert_eq!(colors[5], 0xC0504D);
        assert_eq!(colors[11], 0x161718);
    }

    #[test]
    fn argb_parsing_drops_alpha() {
        assert_eq!(parse_argb("FF336699"), Some(0x336699));
        assert_eq!(parse_argb("#336699"), Some(0x336699));
        assert_eq!(parse_argb("theme"), None);
    }
}
