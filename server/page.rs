/// The drawing page is a single static template compiled into the binary;
/// no placeholders, no per-request rendering work.
const TEMPLATE: &str = include_str!("assets/index.html");

pub fn canvas_page() -> String {
    TEMPLATE.to_owned()
}
