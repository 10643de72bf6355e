//! End-to-end scenarios: literal documents in, the exact event sequence
//! on the builder out.

use pretty_assertions::assert_eq;
use xopp_parser::builder::DocumentBuilder;
use xopp_parser::errors::{Error, IllFormedError};
use xopp_parser::parser::XoppParser;
use xopp_parser::reader::Reader;
use xopp_parser::value::{CapStyle, Color, LineStyle, PageType, Point, StrokeTool};

/// Records every event as a readable line.
#[derive(Default)]
struct Recording {
    events: Vec<String>,
    complete: bool,
}

fn hex(c: Color) -> String {
    format!("#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a)
}

impl DocumentBuilder for Recording {
    fn add_xournal(&mut self, creator: &str, fileversion: u32) {
        self.events.push(format!("add_xournal {} {}", creator, fileversion));
    }
    fn add_mrwriter(&mut self, creator: &str) {
        self.events.push(format!("add_mrwriter {}", creator));
    }
    fn add_page(&mut self, width: f64, height: f64) {
        self.events.push(format!("add_page {} {}", width, height));
    }
    fn set_bg_name(&mut self, name: &str) {
        self.events.push(format!("set_bg_name {:?}", name));
    }
    fn set_bg_solid(&mut self, page_type: PageType, color: Color) {
        self.events.push(format!(
            "set_bg_solid {:?} {:?} {}",
            page_type.format,
            page_type.config,
            hex(color)
        ));
    }
    fn set_bg_pixmap(&mut self, attach: bool, path: &str) {
        self.events.push(format!("set_bg_pixmap {} {:?}", attach, path));
    }
    fn set_bg_pixmap_cloned(&mut self, page_nr: usize) {
        self.events.push(format!("set_bg_pixmap_cloned {}", page_nr));
    }
    fn load_bg_pdf(&mut self, attach: bool, path: &str) {
        self.events.push(format!("load_bg_pdf {} {:?}", attach, path));
    }
    fn set_bg_pdf(&mut self, pageno: usize) {
        self.events.push(format!("set_bg_pdf {}", pageno));
    }
    fn add_layer(&mut self, name: Option<&str>) {
        self.events.push(format!("add_layer {:?}", name));
    }
    fn finalize_layer(&mut self) {
        self.events.push("finalize_layer".to_string());
    }
    fn add_stroke(
        &mut self,
        tool: StrokeTool,
        color: Color,
        width: f64,
        fill: i32,
        cap_style: CapStyle,
        line_style: Option<LineStyle>,
        audio_fn: &str,
        audio_ts: u64,
    ) {
        self.events.push(format!(
            "add_stroke {:?} {} {} {} {:?} {:?} {:?} {}",
            tool,
            hex(color),
            width,
            fill,
            cap_style,
            line_style,
            audio_fn,
            audio_ts
        ));
    }
    fn set_stroke_points(&mut self, points: &[Point], pressures: &[f64]) {
        let pairs: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
        self.events
            .push(format!("set_stroke_points {:?} {:?}", pairs, pressures));
    }
    fn finalize_stroke(&mut self) {
        self.events.push("finalize_stroke".to_string());
    }
    fn add_text(
        &mut self,
        font: &str,
        size: f64,
        x: f64,
        y: f64,
        color: Color,
        audio_fn: &str,
        audio_ts: u64,
    ) {
        self.events.push(format!(
            "add_text {:?} {} {} {} {} {:?} {}",
            font,
            size,
            x,
            y,
            hex(color),
            audio_fn,
            audio_ts
        ));
    }
    fn set_text_contents(&mut self, text: &str) {
        self.events.push(format!("set_text_contents {:?}", text));
    }
    fn finalize_text(&mut self) {
        self.events.push("finalize_text".to_string());
    }
    fn add_image(&mut self, left: f64, top: f64, right: f64, bottom: f64) {
        self.events
            .push(format!("add_image {} {} {} {}", left, top, right, bottom));
    }
    fn set_image_data(&mut self, data: Vec<u8>) {
        self.events.push(format!("set_image_data {:?}", data));
    }
    fn set_image_attachment(&mut self, path: &str) {
        self.events.push(format!("set_image_attachment {:?}", path));
    }
    fn finalize_image(&mut self) {
        self.events.push("finalize_image".to_string());
    }
    fn add_tex_image(&mut self, left: f64, top: f64, right: f64, bottom: f64, tex: &str) {
        self.events.push(format!(
            "add_tex_image {} {} {} {} {:?}",
            left, top, right, bottom, tex
        ));
    }
    fn set_tex_image_data(&mut self, data: Vec<u8>) {
        self.events.push(format!("set_tex_image_data {:?}", data));
    }
    fn set_tex_image_attachment(&mut self, path: &str) {
        self.events.push(format!("set_tex_image_attachment {:?}", path));
    }
    fn finalize_tex_image(&mut self) {
        self.events.push("finalize_tex_image".to_string());
    }
    fn add_audio_attachment(&mut self, path: &str) {
        self.events.push(format!("add_audio_attachment {:?}", path));
    }
    fn finalize_page(&mut self) {
        self.events.push("finalize_page".to_string());
    }
    fn finalize_document(&mut self) {
        self.events.push("finalize_document".to_string());
        self.complete = true;
    }
    fn is_parsing_complete(&self) -> bool {
        self.complete
    }
}

fn parse(xml: &str) -> Recording {
    let mut recording = Recording::default();
    XoppParser::new(Reader::from_str(xml), &mut recording)
        .parse()
        .unwrap();
    recording
}

fn parse_err(xml: &str) -> Error {
    let mut recording = Recording::default();
    XoppParser::new(Reader::from_str(xml), &mut recording)
        .parse()
        .unwrap_err()
}

/// Wraps layer content in the usual document skeleton.
fn in_layer(content: &str) -> String {
    format!(
        "<xournal creator=\"t\" fileversion=\"4\"><page width=\"612\" height=\"792\">\
         <background type=\"solid\" color=\"#ffffffff\" style=\"plain\"/>\
         <layer>{}</layer></page></xournal>",
        content
    )
}

/// The events of `in_layer` up to the layer's content.
fn layer_prefix() -> Vec<String> {
    vec![
        "add_xournal t 4".to_string(),
        "add_page 612 792".to_string(),
        "set_bg_solid Plain \"\" #ffffffff".to_string(),
        "add_layer None".to_string(),
    ]
}

/// The events of `in_layer` after the layer's content.
fn layer_suffix() -> Vec<String> {
    vec![
        "finalize_layer".to_string(),
        "finalize_page".to_string(),
        "finalize_document".to_string(),
    ]
}

fn layer_events(content: Vec<String>) -> Vec<String> {
    let mut events = layer_prefix();
    events.extend(content);
    events.extend(layer_suffix());
    events
}

#[test]
fn minimal_document() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\"><page width=\"100\" height=\"200\">\
         <background type=\"solid\" color=\"#ffffffff\" style=\"plain\"/>\
         <layer/></page></xournal>",
    );
    assert_eq!(
        recording.events,
        vec![
            "add_xournal x 4",
            "add_page 100 200",
            "set_bg_solid Plain \"\" #ffffffff",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
    assert!(recording.is_parsing_complete());
}

#[test]
fn stroke_with_inline_pressures() {
    let recording = parse(&in_layer(
        "<stroke tool=\"pen\" color=\"#000000ff\" width=\"1.5 0.8 0.9\">10 20 30 40</stroke>",
    ));
    assert_eq!(
        recording.events,
        layer_events(vec![
            "add_stroke Pen #000000ff 1.5 -1 Round None \"\" 0".to_string(),
            "set_stroke_points [(10.0, 20.0), (30.0, 40.0)] [0.8, 0.9]".to_string(),
            "finalize_stroke".to_string(),
        ])
    );
}

#[test]
fn timestamp_attributes_the_next_stroke_only() {
    let recording = parse(&in_layer(
        "<timestamp fn=\"a.mp3\" ts=\"500\"/>\
         <stroke tool=\"pen\" color=\"#000000ff\" width=\"1\">0 0 1 1</stroke>\
         <stroke tool=\"pen\" color=\"#000000ff\" width=\"1\">2 2 3 3</stroke>",
    ));
    assert_eq!(
        recording.events,
        layer_events(vec![
            "add_stroke Pen #000000ff 1 -1 Round None \"a.mp3\" 500".to_string(),
            "set_stroke_points [(0.0, 0.0), (1.0, 1.0)] []".to_string(),
            "finalize_stroke".to_string(),
            "add_stroke Pen #000000ff 1 -1 Round None \"\" 0".to_string(),
            "set_stroke_points [(2.0, 2.0), (3.0, 3.0)] []".to_string(),
            "finalize_stroke".to_string(),
        ])
    );
}

#[test]
fn own_audio_attributes_win_over_buffered_timestamp() {
    let recording = parse(&in_layer(
        "<timestamp fn=\"old.mp3\" ts=\"100\"/>\
         <stroke tool=\"pen\" color=\"#000000ff\" width=\"1\" fn=\"own.mp3\" ts=\"7\">0 0 1 1</stroke>\
         <stroke tool=\"pen\" color=\"#000000ff\" width=\"1\">2 2 3 3</stroke>",
    ));
    // the buffered timestamp is dropped, not deferred to the next stroke
    assert_eq!(
        recording.events[4],
        "add_stroke Pen #000000ff 1 -1 Round None \"own.mp3\" 7"
    );
    assert_eq!(
        recording.events[7],
        "add_stroke Pen #000000ff 1 -1 Round None \"\" 0"
    );
}

#[test]
fn first_pdf_background_wins() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\">\
         <page width=\"612\" height=\"792\">\
         <background type=\"pdf\" domain=\"absolute\" filename=\"doc.pdf\" pageno=\"1\"/>\
         <layer/></page>\
         <page width=\"612\" height=\"792\">\
         <background type=\"pdf\" pageno=\"3\"/>\
         <layer/></page></xournal>",
    );
    assert_eq!(
        recording.events,
        vec![
            "add_xournal x 4",
            "add_page 612 792",
            "load_bg_pdf false \"doc.pdf\"",
            "set_bg_pdf 0",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "add_page 612 792",
            "set_bg_pdf 2",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
}

#[test]
fn pdf_clone_domain_is_rewritten_to_absolute() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\">\
         <page width=\"612\" height=\"792\">\
         <background type=\"pdf\" domain=\"clone\" filename=\"doc.pdf\" pageno=\"2\"/>\
         <layer/></page></xournal>",
    );
    assert_eq!(recording.events[2], "load_bg_pdf false \"doc.pdf\"");
    assert_eq!(recording.events[3], "set_bg_pdf 1");
}

#[test]
fn entity_in_text_contents() {
    let recording = parse(&in_layer(
        "<text font=\"Sans\" size=\"12\" x=\"0\" y=\"0\" color=\"#000000ff\">A&amp;B</text>",
    ));
    assert_eq!(
        recording.events,
        layer_events(vec![
            "add_text \"Sans\" 12 0 0 #000000ff \"\" 0".to_string(),
            "set_text_contents \"A&B\"".to_string(),
            "finalize_text".to_string(),
        ])
    );
}

#[test]
fn mismatched_close_is_fatal_and_names_both_tags() {
    let err = parse_err(
        "<xournal creator=\"x\" fileversion=\"4\"><page width=\"100\" height=\"200\">\
         <background type=\"solid\" color=\"#ffffffff\" style=\"plain\"/></layer></xournal>",
    );
    match err {
        Error::IllFormed(IllFormedError::MismatchedEndTag { expected, found }) => {
            assert_eq!(expected, "page");
            assert_eq!(found, "layer");
        }
        other => panic!("expected a mismatched end tag error, got {:?}", other),
    }
    let message = format!(
        "{}",
        IllFormedError::MismatchedEndTag {
            expected: "page".to_string(),
            found: "layer".to_string(),
        }
    );
    assert!(message.contains("page") && message.contains("layer"));
}

#[test]
fn empty_root_is_rejected() {
    match parse_err("<xournal creator=\"x\"/>") {
        Error::IllFormed(IllFormedError::EmptyRootElement(name)) => assert_eq!(name, "xournal"),
        other => panic!("expected an empty root error, got {:?}", other),
    }
}

#[test]
fn closing_tag_at_root_is_rejected() {
    match parse_err("</xournal>") {
        Error::IllFormed(IllFormedError::UnmatchedEndTag(name)) => assert_eq!(name, "xournal"),
        other => panic!("expected an unmatched end tag error, got {:?}", other),
    }
}

#[test]
fn truncated_document_is_rejected() {
    match parse_err("<xournal creator=\"x\" fileversion=\"4\"><page width=\"1\" height=\"1\">") {
        Error::IllFormed(IllFormedError::UnclosedDocument(name)) => assert_eq!(name, "page"),
        other => panic!("expected an unclosed document error, got {:?}", other),
    }
}

#[test]
fn document_without_root_is_rejected() {
    match parse_err("  \n ") {
        Error::IllFormed(IllFormedError::MissingRootElement) => {}
        other => panic!("expected a missing root error, got {:?}", other),
    }
}

#[test]
fn unknown_root_is_parsed_as_document() {
    let recording = parse(
        "<scribble><page width=\"10\" height=\"20\"><layer/></page></scribble>",
    );
    assert_eq!(
        recording.events,
        vec![
            "add_page 10 20",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
    assert!(recording.is_parsing_complete());
}

#[test]
fn unknown_subtrees_are_skipped() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\">\
         <fancy><deeply><page width=\"9\" height=\"9\">\
         <layer><stroke tool=\"pen\" color=\"#000000ff\" width=\"1\">0 0 1 1</stroke></layer>\
         </page></deeply></fancy>\
         <page width=\"1\" height=\"2\"><layer/></page></xournal>",
    );
    // recognised tags nested in the unknown subtree must not re-enter
    // the grammar and produce events
    assert_eq!(
        recording.events,
        vec![
            "add_xournal x 4",
            "add_page 1 2",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
}

#[test]
fn title_subtree_is_skipped() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\">\
         <title>notes<page width=\"9\" height=\"9\"><layer/></page></title>\
         <page width=\"1\" height=\"2\"><layer/></page></xournal>",
    );
    assert_eq!(
        recording.events,
        vec![
            "add_xournal x 4",
            "add_page 1 2",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
}

#[test]
fn misplaced_recognized_tag_still_balances() {
    // a layer directly under the root is not grammar; its subtree is
    // skipped but its closing tag must still match
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\">\
         <layer><stroke tool=\"pen\" color=\"#000000ff\" width=\"1\">0 0 1 1</stroke></layer>\
         <page width=\"1\" height=\"2\"><layer/></page></xournal>",
    );
    assert_eq!(
        recording.events,
        vec![
            "add_xournal x 4",
            "add_page 1 2",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
}

#[test]
fn trailing_elements_after_root_are_ignored() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\"><page width=\"1\" height=\"2\">\
         <layer/></page></xournal><extra><more/></extra>",
    );
    assert_eq!(recording.events.last().unwrap(), "finalize_document");
    assert!(recording.is_parsing_complete());
}

#[test]
fn empty_elements_still_finalize() {
    let recording = parse(&in_layer(
        "<stroke tool=\"pen\" color=\"#000000ff\" width=\"1\"/>\
         <text font=\"Sans\" size=\"12\" x=\"0\" y=\"0\" color=\"#000000ff\"/>\
         <image left=\"0\" top=\"0\" right=\"5\" bottom=\"5\"/>",
    ));
    assert_eq!(
        recording.events,
        layer_events(vec![
            "add_stroke Pen #000000ff 1 -1 Round None \"\" 0".to_string(),
            "finalize_stroke".to_string(),
            "add_text \"Sans\" 12 0 0 #000000ff \"\" 0".to_string(),
            "finalize_text".to_string(),
            "add_image 0 0 5 5".to_string(),
            "finalize_image".to_string(),
        ])
    );
}

#[test]
fn image_with_payload_and_attachment() {
    let recording = parse(&in_layer(
        "<image left=\"1\" top=\"2\" right=\"3\" bottom=\"4\">aGVsbG8=\
         <attachment path=\"img.png\"/></image>",
    ));
    assert_eq!(
        recording.events,
        layer_events(vec![
            "add_image 1 2 3 4".to_string(),
            "set_image_data [104, 101, 108, 108, 111]".to_string(),
            "set_image_attachment \"img.png\"".to_string(),
            "finalize_image".to_string(),
        ])
    );
}

#[test]
fn teximage_carries_its_source() {
    let recording = parse(&in_layer(
        "<teximage left=\"0\" top=\"0\" right=\"8\" bottom=\"8\" \
         text=\"x^2\" texlength=\"3\">aGVsbG8=</teximage>",
    ));
    assert_eq!(
        recording.events,
        layer_events(vec![
            "add_tex_image 0 0 8 8 \"x^2\"".to_string(),
            "set_tex_image_data [104, 101, 108, 108, 111]".to_string(),
            "finalize_tex_image".to_string(),
        ])
    );
}

#[test]
fn mrwriter_document_with_pressures_attribute() {
    let recording = parse(
        "<MrWriter creator=\"MrWriter 0.3\"><page width=\"600\" height=\"800\">\
         <layer><stroke tool=\"pen\" color=\"#000000ff\" width=\"2\" \
         pressures=\"0.5 0.6\">0 0 1 1 2 2</stroke></layer></page></MrWriter>",
    );
    assert_eq!(
        recording.events,
        vec![
            "add_mrwriter MrWriter 0.3",
            "add_page 600 800",
            "add_layer None",
            "add_stroke Pen #000000ff 2 -1 Round None \"\" 0",
            "set_stroke_points [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)] [0.5, 0.6]",
            "finalize_stroke",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
}

#[test]
fn pixmap_backgrounds() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\">\
         <page width=\"1\" height=\"1\">\
         <background type=\"pixmap\" domain=\"attach\" filename=\"bg.png\"/><layer/></page>\
         <page width=\"1\" height=\"1\">\
         <background type=\"pixmap\" domain=\"clone\" filename=\"0\"/><layer/></page>\
         </xournal>",
    );
    assert_eq!(recording.events[2], "set_bg_pixmap true \"bg.png\"");
    assert_eq!(recording.events[7], "set_bg_pixmap_cloned 0");
}

#[test]
fn background_name_and_styled_stroke() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\"><page width=\"1\" height=\"1\">\
         <background name=\"Paper 1\" type=\"solid\" color=\"pink\" style=\"graph\" \
         config=\"squareSize=14.17\"/>\
         <layer><stroke tool=\"highlighter\" color=\"#ffff00ff\" width=\"8\" fill=\"128\" \
         capStyle=\"butt\" style=\"dash\">0 0 9 9</stroke></layer></page></xournal>",
    );
    assert_eq!(recording.events[2], "set_bg_name \"Paper 1\"");
    // "pink" exists only in the background translation table
    assert_eq!(
        recording.events[3],
        "set_bg_solid Graph \"squareSize=14.17\" #fabebeff"
    );
    assert_eq!(
        recording.events[5],
        "add_stroke Highlighter #ffff00ff 8 128 Butt Some(Dash) \"\" 0"
    );
}

#[test]
fn audio_attachment_and_ignored_header_elements() {
    let recording = parse(
        "<xournal creator=\"x\" fileversion=\"4\">\
         <title>My notes</title><preview>aGVsbG8=</preview>\
         <audio fn=\"rec.ogg\"/>\
         <page width=\"1\" height=\"1\"><layer/></page></xournal>",
    );
    assert_eq!(
        recording.events,
        vec![
            "add_xournal x 4",
            "add_audio_attachment \"rec.ogg\"",
            "add_page 1 1",
            "add_layer None",
            "finalize_layer",
            "finalize_page",
            "finalize_document",
        ]
    );
}
