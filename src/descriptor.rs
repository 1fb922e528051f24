//! Format descriptor resolution.
//!
//! A descriptor is a plain-text companion file that declares, section by
//! section, the columns found in W2 data files. Each section opens with a
//! dot-padded header line such as
//!
//! ```text
//! ........CONSTITUENT NAME      FORMAT    MULT    MIN     MAX     PLOT  SEQ
//! Temperature [T1], C           (f10.3)   1.0     -2.0    30.0    ON    4
//! ```
//!
//! The header line is the source of truth for column positions: every zone
//! starts at the character column of its header token and runs up to the
//! next zone, and the name zone runs from the start of the line up to the
//! first zone. A blank line closes the section.

use crate::constants::{PLOT_OFF, PLOT_ON, SECTION_LABEL_SUFFIX, SECTION_MARKER, zones};
use crate::error::{Result, W2Error};
use crate::models::{FieldSpec, FormatCode};
use crate::parser::numeric::parse_number;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Zones of a descriptor field line, apart from the name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Format,
    Multiplier,
    Min,
    Max,
    Plot,
    Sequence,
}

impl Zone {
    const ALL: [Zone; 6] = [
        Zone::Format,
        Zone::Multiplier,
        Zone::Min,
        Zone::Max,
        Zone::Plot,
        Zone::Sequence,
    ];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Zone::Format => zones::FORMAT,
            Zone::Multiplier => zones::MULTIPLIER,
            Zone::Min => zones::MIN,
            Zone::Max => zones::MAX,
            Zone::Plot => zones::PLOT,
            Zone::Sequence => zones::SEQUENCE,
        }
    }

    fn label(self) -> &'static str {
        self.aliases()[0]
    }
}

/// Column layout derived from one section header line
#[derive(Debug, Clone)]
struct ZoneLayout {
    /// Zones sorted by starting character column
    starts: Vec<(Zone, usize)>,
}

impl ZoneLayout {
    fn name_end(&self) -> usize {
        self.starts[0].1
    }

    fn last_start(&self) -> usize {
        self.starts[self.starts.len() - 1].1
    }

    /// Character range of each zone on a line of `len` characters
    fn ranges(&self, len: usize) -> impl Iterator<Item = (Zone, usize, usize)> + '_ {
        self.starts.iter().enumerate().map(move |(i, &(zone, start))| {
            let end = self
                .starts
                .get(i + 1)
                .map(|&(_, next)| next)
                .unwrap_or(len);
            (zone, start.min(len), end.min(len))
        })
    }
}

/// A named group of fields within a descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorSection {
    pub name: String,
    /// 1-based line of the section header
    pub line_number: usize,
    pub fields: Vec<FieldSpec>,
}

/// Parsed, immutable column layout for a family of data files
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatDescriptor {
    source: Option<PathBuf>,
    sections: Vec<DescriptorSection>,
}

impl FormatDescriptor {
    /// Parse a descriptor file
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(W2Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let reader = BufReader::new(File::open(path)?);
        let descriptor = Self::from_reader(reader, Some(path))?;
        info!(
            "Loaded descriptor {} with {} sections and {} fields",
            path.display(),
            descriptor.sections.len(),
            descriptor.field_count()
        );
        Ok(descriptor)
    }

    /// Parse descriptor text held in memory
    pub fn parse_str(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes(), None)
    }

    /// Parse descriptor lines from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R, source: Option<&Path>) -> Result<Self> {
        let mut parser = SectionParser::new(source);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            parser.feed(index + 1, line.trim_end_matches('\r'))?;
        }
        Ok(parser.finish())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn sections(&self) -> &[DescriptorSection] {
        &self.sections
    }

    /// Look up a section by name, ignoring case
    pub fn section(&self, name: &str) -> Option<&DescriptorSection> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    /// All fields in declaration order across sections
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// Fields to read from a data file, optionally restricted to one section
    pub fn select(&self, section: Option<&str>) -> Result<Vec<FieldSpec>> {
        match section {
            None => Ok(self.fields().cloned().collect()),
            Some(name) => self
                .section(name)
                .map(|s| s.fields.clone())
                .ok_or_else(|| W2Error::Configuration {
                    message: format!(
                        "descriptor {} has no section named '{}' (available: {})",
                        self.source_label().display(),
                        name,
                        self.sections
                            .iter()
                            .map(|s| s.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }),
        }
    }

    fn source_label(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(|| PathBuf::from("<descriptor>"))
    }
}

/// Parse a descriptor file
pub fn parse_descriptor(path: &Path) -> Result<FormatDescriptor> {
    FormatDescriptor::from_path(path)
}

/// Line-by-line state machine over descriptor text
struct SectionParser {
    source: Option<PathBuf>,
    sections: Vec<DescriptorSection>,
    current: Option<(DescriptorSection, ZoneLayout)>,
    ignored_lines: usize,
}

impl SectionParser {
    fn new(source: Option<&Path>) -> Self {
        Self {
            source: source.map(Path::to_path_buf),
            sections: Vec::new(),
            current: None,
            ignored_lines: 0,
        }
    }

    fn error(&self, line: usize, reason: impl Into<String>) -> W2Error {
        W2Error::DescriptorParse {
            path: self
                .source
                .clone()
                .unwrap_or_else(|| PathBuf::from("<descriptor>")),
            line,
            reason: reason.into(),
        }
    }

    fn feed(&mut self, line_number: usize, line: &str) -> Result<()> {
        if line.trim_start().starts_with(SECTION_MARKER) {
            self.close_section();
            let chars: Vec<char> = line.chars().collect();
            let (name, layout) = self.parse_header(line_number, &chars)?;
            debug!(
                "Descriptor section '{}' at line {} with zones {:?}",
                name, line_number, layout.starts
            );
            self.current = Some((
                DescriptorSection {
                    name,
                    line_number,
                    fields: Vec::new(),
                },
                layout,
            ));
            return Ok(());
        }

        if line.trim().is_empty() {
            self.close_section();
            return Ok(());
        }

        let Some((section, layout)) = &self.current else {
            self.ignored_lines += 1;
            return Ok(());
        };

        let chars: Vec<char> = line.chars().collect();
        let field = self.parse_field(line_number, &chars, layout, &section.name)?;
        if let Some((section, _)) = self.current.as_mut() {
            section.fields.push(field);
        }
        Ok(())
    }

    fn close_section(&mut self) {
        if let Some((section, _)) = self.current.take() {
            self.sections.push(section);
        }
    }

    fn finish(mut self) -> FormatDescriptor {
        self.close_section();
        if self.ignored_lines > 0 {
            debug!(
                "Ignored {} descriptor lines outside any section",
                self.ignored_lines
            );
        }
        FormatDescriptor {
            source: self.source,
            sections: self.sections,
        }
    }

    fn parse_header(&self, line_number: usize, chars: &[char]) -> Result<(String, ZoneLayout)> {
        let tokens = tokenize(chars);

        // Zone tokens are only recognised after the label's NAME token, so a
        // label word that happens to match a zone alias is not mistaken for one.
        let first_zone_token = tokens
            .iter()
            .position(|(_, t)| t.eq_ignore_ascii_case(SECTION_LABEL_SUFFIX))
            .map(|p| p + 1)
            .unwrap_or(1);

        let mut starts = Vec::with_capacity(Zone::ALL.len());
        for zone in Zone::ALL {
            let found = tokens.iter().skip(first_zone_token).find(|(_, t)| {
                zone.aliases()
                    .iter()
                    .any(|alias| t.eq_ignore_ascii_case(alias))
            });
            match found {
                Some(&(start, _)) => starts.push((zone, start)),
                None => {
                    return Err(self.error(
                        line_number,
                        format!("section header is missing the {} zone", zone.label()),
                    ));
                }
            }
        }
        starts.sort_by_key(|&(_, start)| start);

        let label: String = chars[..starts[0].1].iter().collect();
        let label = label.trim().trim_start_matches('.').trim();
        let name = strip_suffix_ignore_case(label, SECTION_LABEL_SUFFIX)
            .trim()
            .to_string();

        Ok((name, ZoneLayout { starts }))
    }

    fn parse_field(
        &self,
        line_number: usize,
        chars: &[char],
        layout: &ZoneLayout,
        section: &str,
    ) -> Result<FieldSpec> {
        if chars.len() <= layout.last_start() {
            return Err(self.error(
                line_number,
                format!(
                    "field line has {} characters but the last zone starts at column {}",
                    chars.len(),
                    layout.last_start() + 1
                ),
            ));
        }

        let name_zone: String = chars[..layout.name_end()].iter().collect();
        let name_zone = name_zone.trim();
        if name_zone.is_empty() {
            return Err(self.error(line_number, "empty NAME zone"));
        }
        let (name, unit) = split_name_unit(name_zone);

        let mut format_code = None;
        let mut multiplier = None;
        let mut min = None;
        let mut max = None;
        let mut plot_flag = None;
        let mut sequence_index = None;

        for (zone, start, end) in layout.ranges(chars.len()) {
            let text: String = chars[start..end].iter().collect();
            let text = text.trim();
            if text.is_empty() {
                return Err(self.error(line_number, format!("empty {} zone", zone.label())));
            }
            let bad = |what: &str| {
                self.error(
                    line_number,
                    format!("invalid {} '{}' in {} zone", what, text, zone.label()),
                )
            };
            match zone {
                Zone::Format => {
                    let code = FormatCode::parse(text).ok_or_else(|| bad("format code"))?;
                    format_code = Some(code);
                }
                Zone::Multiplier => {
                    multiplier = Some(parse_number(text).ok_or_else(|| bad("number"))?);
                }
                Zone::Min => min = Some(parse_number(text).ok_or_else(|| bad("number"))?),
                Zone::Max => max = Some(parse_number(text).ok_or_else(|| bad("number"))?),
                Zone::Plot => {
                    plot_flag = Some(if text.eq_ignore_ascii_case(PLOT_ON) {
                        true
                    } else if text.eq_ignore_ascii_case(PLOT_OFF) {
                        false
                    } else {
                        return Err(bad("plot flag"));
                    })
                }
                Zone::Sequence => {
                    let index = text.parse::<i64>().map_err(|_| bad("sequence index"))?;
                    sequence_index = Some(index);
                }
            }
        }

        // Every zone was visited above, so these are all populated.
        let (
            Some(format_code),
            Some(multiplier),
            Some(min),
            Some(max),
            Some(plot_flag),
            Some(sequence_index),
        ) = (format_code, multiplier, min, max, plot_flag, sequence_index)
        else {
            return Err(self.error(line_number, "incomplete field line"));
        };
        Ok(FieldSpec {
            name,
            unit,
            format_code,
            multiplier,
            min,
            max,
            plot_flag,
            sequence_index,
            section: section.to_string(),
            line_number,
        })
    }
}

/// Whitespace-separated tokens with their starting character column
fn tokenize(chars: &[char]) -> Vec<(usize, String)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in chars.iter().enumerate() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                tokens.push((s, chars[s..i].iter().collect()));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push((s, chars[s..].iter().collect()));
    }
    tokens
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> &'a str {
    if text.len() >= suffix.len()
        && text.is_char_boundary(text.len() - suffix.len())
        && text[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        &text[..text.len() - suffix.len()]
    } else {
        text
    }
}

/// Split `Temperature [T1], C` into the name and its unit annotation
fn split_name_unit(zone: &str) -> (String, Option<String>) {
    match zone.rsplit_once(',') {
        Some((name, unit)) if !name.trim().is_empty() => {
            let unit = unit.trim();
            (
                name.trim().to_string(),
                (!unit.is_empty()).then(|| unit.to_string()),
            )
        }
        _ => (zone.to_string(), None),
    }
}
