//! Page layout for the itinerary report
//!
//! Layout is a pure first pass: content is broken into blocks, each block
//! is measured, and the Paginator starts a new page whenever the next block
//! would run into the bottom margin. Footers need the final page count, so
//! they are stamped afterwards by `stamp_footers`.

use chrono::NaiveDateTime;
use tracing::debug;

use super::format::{MM_PER_PT, chars_per_line, format_duration, format_price, format_stops, report_filename, wrap};
use crate::domain::{Activity, DayPlan, Flight, Stay, TripPlan, TripRequest};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 18.0;

/// Space reserved above the bottom margin for the footer
pub const FOOTER_SPACE_MM: f32 = 8.0;

const HEADER_BAND_MM: f32 = 30.0;
const LINE_SPACING: f32 = 1.35;
const BLOCK_GAP_MM: f32 = 3.0;
const INDENT_MM: f32 = 4.0;

const TITLE_SIZE: f32 = 20.0;
const SUBTITLE_SIZE: f32 = 11.0;
const SECTION_SIZE: f32 = 14.0;
const HEADING_SIZE: f32 = 11.0;
const BODY_SIZE: f32 = 9.5;

/// RGB colour, components in 0..=1
pub type Color = (f32, f32, f32);

pub const INK: Color = (0.13, 0.13, 0.13);
pub const MUTED: Color = (0.42, 0.42, 0.42);
pub const ACCENT: Color = (0.05, 0.43, 0.47);
pub const WHITE: Color = (1.0, 1.0, 1.0);

/// Something drawn on a page; `y` is measured from the top edge in mm
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Full-width filled band
    Band { y: f32, height: f32, color: Color },
    /// One line of text; `y` is the baseline
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Color,
        text: String,
    },
    /// Thin horizontal separator across the content width
    Rule { y: f32, color: Color },
}

/// One laid-out page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
    /// "Page X of N", set by the footer pass
    pub footer: Option<String>,
}

impl Page {
    /// All text on the page, in drawing order
    pub fn text(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A fully paginated report
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub filename: String,
    pub pages: Vec<Page>,
}

impl Report {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Report settings
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Currency code for prices that carry none
    pub default_currency: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            default_currency: super::format::DEFAULT_CURRENCY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    indent: f32,
    size: f32,
    bold: bool,
    color: Color,
    text: String,
}

impl Line {
    fn height(&self) -> f32 {
        self.size * MM_PER_PT * LINE_SPACING
    }
}

/// A unit that is never split across pages unless it is taller than a page
#[derive(Debug, Clone, Default)]
struct Block {
    lines: Vec<Line>,
    rule_after: bool,
}

impl Block {
    fn new() -> Self {
        Self::default()
    }

    /// Add text, wrapped to the content width
    fn text(mut self, text: &str, size: f32, bold: bool, color: Color, indent: f32) -> Self {
        let width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - indent;
        for chunk in wrap(text, chars_per_line(width, size)) {
            self.lines.push(Line {
                indent,
                size,
                bold,
                color,
                text: chunk,
            });
        }
        self
    }

    fn heading(self, text: &str) -> Self {
        self.text(text, HEADING_SIZE, true, INK, 0.0)
    }

    fn body(self, text: &str) -> Self {
        self.text(text, BODY_SIZE, false, INK, INDENT_MM)
    }

    fn muted(self, text: &str) -> Self {
        self.text(text, BODY_SIZE, false, MUTED, INDENT_MM)
    }

    fn with_rule(mut self) -> Self {
        self.rule_after = true;
        self
    }

    fn height(&self) -> f32 {
        self.lines.iter().map(Line::height).sum::<f32>() + BLOCK_GAP_MM
    }
}

/// Running vertical cursor over a growing list of pages
#[derive(Debug)]
pub struct Paginator {
    pages: Vec<Page>,
    cursor: f32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new()
    }
}

impl Paginator {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            cursor: MARGIN_MM,
        }
    }

    /// Lowest y content may reach
    fn bottom() -> f32 {
        PAGE_HEIGHT_MM - MARGIN_MM - FOOTER_SPACE_MM
    }

    pub fn remaining(&self) -> f32 {
        Self::bottom() - self.cursor
    }

    fn at_top(&self) -> bool {
        self.cursor <= MARGIN_MM
    }

    pub fn new_page(&mut self) {
        debug!(page = self.pages.len() + 1, "new_page: called");
        self.pages.push(Page::default());
        self.cursor = MARGIN_MM;
    }

    /// Break the page if `height` does not fit below the cursor
    pub fn ensure_space(&mut self, height: f32) {
        if height > self.remaining() && !self.at_top() {
            self.new_page();
        }
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn place_line(&mut self, line: &Line) {
        let height = line.height();
        // Baseline sits roughly three quarters down the line box
        let baseline = self.cursor + height * 0.75;
        self.push(Element::Text {
            x: MARGIN_MM + line.indent,
            y: baseline,
            size: line.size,
            bold: line.bold,
            color: line.color,
            text: line.text.clone(),
        });
        self.cursor += height;
    }

    fn place(&mut self, block: &Block) {
        let usable = Self::bottom() - MARGIN_MM;
        if block.height() > usable {
            // Taller than a page: break between lines instead
            for line in &block.lines {
                self.ensure_space(line.height());
                self.place_line(line);
            }
        } else {
            self.ensure_space(block.height());
            for line in &block.lines {
                self.place_line(line);
            }
        }
        if block.rule_after {
            let y = self.cursor + BLOCK_GAP_MM / 2.0;
            self.push(Element::Rule { y, color: MUTED });
        }
        self.cursor += BLOCK_GAP_MM;
    }

    /// Place a section title together with its first block
    fn place_section(&mut self, title: &str, blocks: &[Block]) {
        let Some(first) = blocks.first() else {
            return;
        };
        let title = Block::new().text(title, SECTION_SIZE, true, ACCENT, 0.0);
        self.ensure_space(title.height() + first.height());
        self.place(&title);
        for block in blocks {
            self.place(block);
        }
    }

    fn header_band(&mut self, title: &str, subtitle: &str) {
        self.push(Element::Band {
            y: 0.0,
            height: HEADER_BAND_MM,
            color: ACCENT,
        });
        self.push(Element::Text {
            x: MARGIN_MM,
            y: 15.0,
            size: TITLE_SIZE,
            bold: true,
            color: WHITE,
            text: title.to_string(),
        });
        self.push(Element::Text {
            x: MARGIN_MM,
            y: 23.0,
            size: SUBTITLE_SIZE,
            bold: false,
            color: WHITE,
            text: subtitle.to_string(),
        });
        self.cursor = HEADER_BAND_MM + 8.0;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn finish(self) -> Vec<Page> {
        self.pages
    }
}

/// Lay out a report for `plan`
///
/// Sections render in a fixed order: header band, trip summary (only with
/// a request), flights, stays, then the day-by-day itinerary. Empty
/// sections are left out.
pub fn layout(
    plan: &TripPlan,
    request: Option<&TripRequest>,
    options: &ReportOptions,
    generated: NaiveDateTime,
) -> Report {
    debug!(
        flights = plan.flights.len(),
        stays = plan.stays.len(),
        days = plan.activities.len(),
        has_request = request.is_some(),
        "layout: called"
    );

    let title = match request {
        Some(r) => format!("{} to {}", r.origin, r.destination),
        None => "Trip Itinerary".to_string(),
    };
    let subtitle = format!("Itinerary generated {}", generated.format("%Y-%m-%d %H:%M"));

    let mut pages = Paginator::new();
    pages.header_band(&title, &subtitle);

    if let Some(request) = request {
        pages.place_section("Trip Summary", &summary_blocks(request));
    }

    let currency = options.default_currency.as_str();
    let flights: Vec<Block> = plan.flights.iter().map(|f| flight_block(f, currency)).collect();
    pages.place_section("Flights", &flights);

    let stays: Vec<Block> = plan.stays.iter().map(|s| stay_block(s, currency)).collect();
    pages.place_section("Accommodation", &stays);

    let days: Vec<(usize, &DayPlan)> = plan.activities.iter().enumerate().filter(|(_, d)| !d.is_empty()).collect();
    if !days.is_empty() {
        let section = Block::new().text("Day-by-Day Itinerary", SECTION_SIZE, true, ACCENT, 0.0);
        let first_day = day_blocks(days[0].0, days[0].1, currency);
        let lead = first_day.iter().take(2).map(Block::height).sum::<f32>();
        pages.ensure_space(section.height() + lead);
        pages.place(&section);
        for (index, day) in days {
            place_day(&mut pages, &day_blocks(index, day, currency));
        }
    }

    let mut pages = pages.finish();
    stamp_footers(&mut pages);
    debug!(pages = pages.len(), "layout: done");

    Report {
        title,
        filename: report_filename(request, generated),
        pages,
    }
}

/// Day heading stays with its first slot; every slot breaks independently
fn place_day(pages: &mut Paginator, blocks: &[Block]) {
    let lead = blocks.iter().take(2).map(Block::height).sum::<f32>();
    pages.ensure_space(lead);
    for block in blocks {
        pages.place(block);
    }
}

/// Second pass: "Page X of N" on every page
pub fn stamp_footers(pages: &mut [Page]) {
    let total = pages.len();
    debug!(total, "stamp_footers: called");
    for (i, page) in pages.iter_mut().enumerate() {
        page.footer = Some(format!("Page {} of {}", i + 1, total));
    }
}

fn summary_blocks(request: &TripRequest) -> Vec<Block> {
    let mut lines = vec![
        format!("Route: {} to {}", request.origin, request.destination),
        format!(
            "Dates: {} to {} ({} {})",
            request.start_date,
            request.end_date,
            request.trip_days(),
            if request.trip_days() == 1 { "day" } else { "days" }
        ),
        format!(
            "Travellers: {} {}",
            request.adults,
            if request.adults == 1 { "adult" } else { "adults" }
        ),
        format!("Budget: {}", request.budget_level),
        format!("Trip type: {}", request.trip_type),
    ];
    if !request.interests.is_empty() {
        lines.push(format!("Interests: {}", request.interests.join(", ")));
    }
    if !request.constraints.is_empty() {
        let constraints: Vec<String> = request.constraints.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        lines.push(format!("Constraints: {}", constraints.join("; ")));
    }
    lines.iter().map(|line| Block::new().body(line)).collect()
}

fn flight_block(flight: &Flight, currency: &str) -> Block {
    let mut block = Block::new().heading(&flight.summary);

    let carrier: Vec<&str> = [flight.airline.as_deref(), flight.flight_number.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !carrier.is_empty() {
        block = block.body(&carrier.join(" "));
    }

    let mut timing = Vec::new();
    if let Some(depart) = &flight.depart_time {
        timing.push(format!("Depart {}", depart));
    }
    if let Some(arrive) = &flight.arrive_time {
        timing.push(format!("Arrive {}", arrive));
    }
    if let Some(stops) = flight.stops {
        timing.push(format_stops(stops));
    }
    if !timing.is_empty() {
        block = block.body(&timing.join(" | "));
    }

    if let Some(price) = flight.est_price {
        block = block.body(&format!("Price: {}", format_price(price, flight.currency.as_deref(), currency)));
    }
    for link in &flight.booking_links {
        block = block.muted(&format!("Book: {}", link));
    }
    block.with_rule()
}

fn stay_block(stay: &Stay, currency: &str) -> Block {
    let mut block = Block::new().heading(&stay.name);
    if !stay.area.is_empty() {
        block = block.body(&format!("Area: {}", stay.area));
    }

    let mut facts = Vec::new();
    if let Some(price) = stay.est_price_per_night {
        facts.push(format!("{} / night", format_price(price, stay.currency.as_deref(), currency)));
    }
    if let Some(score) = stay.score {
        facts.push(format!("Rating {:.1}", score));
    }
    if !facts.is_empty() {
        block = block.body(&facts.join(" | "));
    }

    if !stay.highlights.is_empty() {
        block = block.muted(&stay.highlights.join(", "));
    }
    for link in &stay.booking_links {
        block = block.muted(&format!("Book: {}", link));
    }
    block.with_rule()
}

fn day_blocks(index: usize, day: &DayPlan, currency: &str) -> Vec<Block> {
    let mut blocks = vec![Block::new().text(&format!("Day {} - {}", index + 1, day.date), HEADING_SIZE, true, ACCENT, 0.0)];
    for (slot, activity) in day.scheduled() {
        blocks.push(activity_block(slot.label(), activity, currency));
    }
    if !day.notes.is_empty() {
        let mut notes = Block::new().body("Notes");
        for note in &day.notes {
            notes = notes.muted(&format!("- {}", note));
        }
        blocks.push(notes);
    }
    blocks
}

fn activity_block(slot: &str, activity: &Activity, currency: &str) -> Block {
    let mut block = Block::new().text(&format!("{}: {}", slot, activity.title), BODY_SIZE + 0.5, true, INK, INDENT_MM);
    if !activity.location.is_empty() {
        block = block.body(&activity.location);
    }

    let mut facts = Vec::new();
    if let Some(hours) = activity.duration_hours.filter(|h| h.is_finite()) {
        facts.push(format_duration(hours));
    }
    if let Some(price) = activity.est_price {
        facts.push(format_price(price, activity.currency.as_deref(), currency));
    }
    if !facts.is_empty() {
        block = block.body(&facts.join(" | "));
    }
    if !activity.tags.is_empty() {
        block = block.muted(&activity.tags.join(", "));
    }
    block
}
