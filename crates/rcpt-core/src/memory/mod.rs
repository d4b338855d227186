//! Learned vendor recognition.
//!
//! Each confirmed vendor leaves a signature (domains, address lines, header
//! lines, name tokens). Later receipts are scored against every signature
//! and a confident match overrides the generic vendor heuristic.

mod store;

pub use store::{JsonVendorStore, MemoryVendorStore, VendorStore};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::receipt::rules::normalize_lines;
use crate::receipt::rules::patterns::{is_address_line, EMAIL, WEB_DOMAIN};

pub const MAX_ADDRESS_LINES: usize = 4;
pub const MAX_HEADER_LINES: usize = 8;
pub const MAX_HEADER_LEN: usize = 120;

/// Minimum score for a memory match to be trusted.
pub const MATCH_THRESHOLD: i32 = 3;

// Score weights. Empirical; tune against real receipts.
const NAME_WEIGHT: i32 = 4;
const KEY_WEIGHT: i32 = 3;
const DOMAIN_WEIGHT: i32 = 5;
const ADDRESS_WEIGHT: i32 = 3;
const HEADER_WEIGHT: i32 = 2;
const TOKEN_WEIGHT: i32 = 2;
const ALL_TOKENS_WEIGHT: i32 = 1;
const FREQUENT_WEIGHT: i32 = 1;

/// Minimum token length for the single-token bonus.
const SIGNIFICANT_TOKEN_LEN: usize = 4;
/// Header lines shorter than this (normalized) are too generic to count.
const MIN_HEADER_MATCH_LEN: usize = 5;

/// Corporate suffixes never used as name tokens.
const TOKEN_STOPLIST: &[&str] = &[
    "inc", "llc", "ltd", "co", "corp", "corporation", "company", "gmbh", "plc", "llp", "pty",
    "the", "and",
];

/// A remembered vendor signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorMemoryEntry {
    /// Canonical vendor name as confirmed.
    pub name: String,
    /// Normalized key, unique across the memory.
    pub key: String,
    #[serde(default)]
    pub domains: BTreeSet<String>,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub header_lines: Vec<String>,
    #[serde(default)]
    pub tokens: BTreeSet<String>,
    #[serde(default)]
    pub count: u32,
}

impl VendorMemoryEntry {
    /// Fold another signature for the same vendor into this one.
    fn absorb(&mut self, other: VendorMemoryEntry) {
        self.domains.extend(other.domains);
        self.tokens.extend(other.tokens);
        push_capped(&mut self.address_lines, other.address_lines, MAX_ADDRESS_LINES);
        push_capped(&mut self.header_lines, other.header_lines, MAX_HEADER_LINES);
    }
}

fn push_capped(target: &mut Vec<String>, items: Vec<String>, cap: usize) {
    for item in items {
        if target.len() >= cap {
            break;
        }
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// A confident memory match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorMatch {
    pub name: String,
    pub key: String,
    pub score: i32,
}

/// Lower-case and collapse every run of non-alphanumerics to one space.
pub fn normalize_key(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Build the signature a confirmed vendor leaves behind for this text.
/// The returned entry has a zero count.
pub fn build_signature(text: &str, vendor_name: &str) -> VendorMemoryEntry {
    let name = vendor_name.trim().to_string();
    let key = normalize_key(&name);
    let lines = normalize_lines(text);

    let mut domains = BTreeSet::new();
    for caps in EMAIL.captures_iter(text) {
        domains.insert(caps[1].to_lowercase());
    }
    for caps in WEB_DOMAIN.captures_iter(text) {
        let domain = caps[1].to_lowercase();
        // An email domain also matches the web pattern; keep one copy
        domains.insert(domain);
    }

    let address_lines: Vec<String> = lines
        .iter()
        .filter(|l| is_address_line(l))
        .take(MAX_ADDRESS_LINES)
        .cloned()
        .collect();

    let mut header_lines = vec![truncate_chars(&name, MAX_HEADER_LEN)];
    push_capped(
        &mut header_lines,
        lines
            .iter()
            .map(|l| truncate_chars(l, MAX_HEADER_LEN))
            .collect(),
        MAX_HEADER_LINES,
    );

    let tokens = key
        .split_whitespace()
        .filter(|t| t.chars().count() > 2 && !TOKEN_STOPLIST.contains(t))
        .map(str::to_string)
        .collect();

    VendorMemoryEntry {
        name,
        key,
        domains,
        address_lines,
        header_lines,
        tokens,
        count: 0,
    }
}

/// Prepared haystacks for scoring one text against many entries.
struct Haystack {
    lower: String,
    /// Normalized text padded with spaces for whole-word containment.
    padded: String,
}

impl Haystack {
    fn new(text: &str) -> Self {
        Self {
            lower: text.to_lowercase(),
            padded: format!(" {} ", normalize_key(text)),
        }
    }

    fn has_phrase(&self, normalized: &str) -> bool {
        !normalized.is_empty() && self.padded.contains(&format!(" {} ", normalized))
    }
}

/// Additive confidence that `text` came from the vendor in `entry`.
pub fn score_entry(text: &str, entry: &VendorMemoryEntry) -> i32 {
    score_against(&Haystack::new(text), entry)
}

fn score_against(hay: &Haystack, entry: &VendorMemoryEntry) -> i32 {
    let mut score = 0;

    let name = entry.name.trim().to_lowercase();
    if !name.is_empty() && hay.lower.contains(&name) {
        score += NAME_WEIGHT;
    }
    if hay.has_phrase(&entry.key) {
        score += KEY_WEIGHT;
    }
    if entry.domains.iter().any(|d| hay.lower.contains(d.as_str())) {
        score += DOMAIN_WEIGHT;
    }
    if entry
        .address_lines
        .iter()
        .any(|line| hay.has_phrase(&normalize_key(line)))
    {
        score += ADDRESS_WEIGHT;
    }
    if entry.header_lines.iter().any(|line| {
        let normalized = normalize_key(line);
        normalized.len() >= MIN_HEADER_MATCH_LEN && hay.has_phrase(&normalized)
    }) {
        score += HEADER_WEIGHT;
    }
    if entry
        .tokens
        .iter()
        .any(|t| t.chars().count() >= SIGNIFICANT_TOKEN_LEN && hay.has_phrase(t))
    {
        score += TOKEN_WEIGHT;
    }
    if !entry.tokens.is_empty() && entry.tokens.iter().all(|t| hay.has_phrase(t)) {
        score += ALL_TOKENS_WEIGHT;
    }
    if entry.count > 2 {
        score += FREQUENT_WEIGHT;
    }

    score
}

/// In-memory set of vendor signatures, unique by normalized key.
#[derive(Debug, Clone, Default)]
pub struct VendorMemory {
    entries: Vec<VendorMemoryEntry>,
}

impl VendorMemory {
    /// Build from persisted entries, merging any duplicate keys.
    pub fn new(entries: Vec<VendorMemoryEntry>) -> Self {
        let mut memory = Self::default();
        for entry in entries {
            match memory.position(&entry.key) {
                Some(i) => {
                    let existing = &mut memory.entries[i];
                    existing.count += entry.count;
                    existing.absorb(entry);
                }
                None => memory.entries.push(entry),
            }
        }
        memory
    }

    pub fn entries(&self) -> &[VendorMemoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Best-scoring entry when its score reaches [`MATCH_THRESHOLD`].
    /// The earliest entry wins ties.
    pub fn find_match(&self, text: &str) -> Option<VendorMatch> {
        let hay = Haystack::new(text);
        let mut best: Option<VendorMatch> = None;

        for entry in &self.entries {
            let score = score_against(&hay, entry);
            if score > best.as_ref().map_or(i32::MIN, |b| b.score) {
                best = Some(VendorMatch {
                    name: entry.name.clone(),
                    key: entry.key.clone(),
                    score,
                });
            }
        }

        let best = best.filter(|b| b.score >= MATCH_THRESHOLD);
        if let Some(ref found) = best {
            debug!("Vendor memory matched '{}' with score {}", found.name, found.score);
        }
        best
    }

    /// Merge the signature of `vendor_name` in `text` into memory, creating
    /// the entry if needed, and bump its count. Returns the updated entry,
    /// or `None` when the vendor name normalizes to nothing.
    pub fn remember(&mut self, text: &str, vendor_name: &str) -> Option<&VendorMemoryEntry> {
        let signature = build_signature(text, vendor_name);
        if signature.key.is_empty() {
            return None;
        }

        let index = match self.position(&signature.key) {
            Some(i) => {
                self.entries[i].absorb(signature);
                i
            }
            None => {
                self.entries.push(signature);
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        entry.count += 1;
        debug!("Remembered vendor '{}' (count {})", entry.name, entry.count);
        Some(entry)
    }
}
