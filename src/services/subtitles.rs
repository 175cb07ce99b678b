//! SRT subtitle translation.
//!
//! Entries are translated in chunks: the texts of one chunk are joined with a
//! blank-line separator, sent as a single request and split back apart. The
//! translator must hand back exactly as many segments as it was given.

use crate::{
    errors::ServiceError,
    services::sub_words::{apply_substitutions, SubWordService},
    translation::{Language, Translator},
};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Joins entry texts inside one translation request
pub const SEGMENT_SEPARATOR: &str = "\n\n";

static TIMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})")
        .expect("valid subtitle timing pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub index: u32,
    pub start: String,
    pub end: String,
    pub text: String,
}

/// Parses SRT text. Accepts a UTF-8 BOM and CRLF line endings.
pub fn parse_srt(input: &str) -> Result<Vec<SubtitleEntry>, ServiceError> {
    let normalized = input
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut entries = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut block_no = 0usize;

    for line in normalized.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            block.push(line);
            continue;
        }
        if block.is_empty() {
            continue;
        }
        block_no += 1;
        entries.push(parse_block(&block, block_no)?);
        block.clear();
    }
    Ok(entries)
}

fn parse_block(lines: &[&str], block_no: usize) -> Result<SubtitleEntry, ServiceError> {
    let malformed =
        |what: &str| ServiceError::InvalidInput(format!("subtitle block {}: {}", block_no, what));

    let index = lines[0]
        .trim()
        .parse::<u32>()
        .map_err(|_| malformed("index line is not a number"))?;
    let timing = lines
        .get(1)
        .and_then(|l| TIMING.captures(l.trim()))
        .ok_or_else(|| malformed("missing or invalid timing line"))?;

    // A cue may have timing only; its text is empty
    Ok(SubtitleEntry {
        index,
        start: timing[1].to_string(),
        end: timing[2].to_string(),
        text: lines[2..].join("\n"),
    })
}

pub fn to_srt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}\n{} --> {}\n{}\n\n", e.index, e.start, e.end, e.text))
        .collect()
}

/// Characters sent for translation: the separator-joined texts
pub fn character_count(entries: &[SubtitleEntry]) -> usize {
    let texts: usize = entries.iter().map(|e| e.text.chars().count()).sum();
    texts + entries.len().saturating_sub(1) * SEGMENT_SEPARATOR.chars().count()
}

/// Translates entry texts chunk by chunk, keeping index and timing
pub async fn translate_entries(
    translator: &dyn Translator,
    entries: &[SubtitleEntry],
    source: Language,
    target: Language,
    chunk_size: usize,
) -> Result<Vec<SubtitleEntry>, ServiceError> {
    if let Some(entry) = entries.iter().find(|e| e.text.contains(SEGMENT_SEPARATOR)) {
        return Err(ServiceError::InvalidInput(format!(
            "subtitle {} contains a blank line",
            entry.index
        )));
    }

    let mut translated = Vec::with_capacity(entries.len());
    for chunk in entries.chunks(chunk_size.max(1)) {
        // Empty cues stay empty and are not sent
        let texts: Vec<&str> = chunk
            .iter()
            .map(|e| e.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect();
        if texts.is_empty() {
            translated.extend(chunk.iter().cloned());
            continue;
        }
        let joined = texts.join(SEGMENT_SEPARATOR);

        let response = translator.translate(source, target, &joined).await?;
        let segments: Vec<&str> = response
            .trim_matches('\n')
            .split(SEGMENT_SEPARATOR)
            .map(|s| s.trim_matches('\n'))
            .collect();

        if segments.len() != texts.len() {
            warn!(
                expected = texts.len(),
                actual = segments.len(),
                "Translator changed the segment count"
            );
            return Err(ServiceError::TranslationMismatch {
                expected: texts.len(),
                actual: segments.len(),
            });
        }

        let mut segments = segments.into_iter();
        for entry in chunk {
            let text = if entry.text.trim().is_empty() {
                entry.text.clone()
            } else {
                segments.next().unwrap_or_default().to_string()
            };
            translated.push(SubtitleEntry {
                text,
                ..entry.clone()
            });
        }
    }
    Ok(translated)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubtitleFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TranslateRequest {
    /// Language code, e.g. `ja`
    pub source: String,
    pub target: String,
    #[validate(length(min = 1))]
    pub files: Vec<SubtitleFile>,
    #[serde(default = "default_true")]
    pub apply_dictionary: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EstimateRequest {
    #[validate(length(min = 1))]
    pub files: Vec<SubtitleFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileResult {
    Translated {
        file_name: String,
        content: String,
        entries: usize,
        characters: usize,
    },
    Failed {
        file_name: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Estimate {
    pub characters: usize,
    pub estimated_cost: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LanguageOption {
    pub code: String,
    pub name: String,
}

pub fn language_options() -> Vec<LanguageOption> {
    Language::all()
        .into_iter()
        .map(|l| LanguageOption {
            code: l.to_string(),
            name: l.display_name().to_string(),
        })
        .collect()
}

fn parse_language(code: &str) -> Result<Language, ServiceError> {
    Language::from_str(code.trim())
        .map_err(|_| ServiceError::InvalidInput(format!("unsupported language: {}", code)))
}

#[derive(Clone)]
pub struct SubtitleService {
    translator: Arc<dyn Translator>,
    sub_words: Arc<SubWordService>,
    chunk_size: usize,
    rate_per_char: f64,
}

impl SubtitleService {
    pub fn new(
        translator: Arc<dyn Translator>,
        sub_words: Arc<SubWordService>,
        chunk_size: usize,
        rate_per_char: f64,
    ) -> Self {
        Self {
            translator,
            sub_words,
            chunk_size: chunk_size.max(1),
            rate_per_char,
        }
    }

    /// Translates each file in turn and reports one result per file
    #[instrument(skip(self, request), fields(files = request.files.len()))]
    pub async fn translate_files(
        &self,
        request: TranslateRequest,
    ) -> Result<Vec<FileResult>, ServiceError> {
        request.validate()?;
        let source = parse_language(&request.source)?;
        let target = parse_language(&request.target)?;
        if source == target {
            return Err(ServiceError::InvalidInput(
                "source and target languages are the same".into(),
            ));
        }

        let words = if request.apply_dictionary {
            self.sub_words.list().await?
        } else {
            Vec::new()
        };

        let mut results = Vec::with_capacity(request.files.len());
        for file in request.files {
            let outcome = self.translate_file(&file, source, target).await;
            match outcome {
                Ok((entries, characters, text)) => {
                    counter!("order_desk.subtitles.files", 1, "status" => "translated");
                    results.push(FileResult::Translated {
                        content: apply_substitutions(&text, &words),
                        file_name: file.name,
                        entries,
                        characters,
                    });
                }
                // Not a per-file problem: nothing else would succeed either
                Err(err @ ServiceError::ServiceUnavailable(_)) => return Err(err),
                Err(err) => {
                    warn!(file = %file.name, error = %err, "Subtitle file failed");
                    counter!("order_desk.subtitles.files", 1, "status" => "failed");
                    results.push(FileResult::Failed {
                        file_name: file.name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            translated = results
                .iter()
                .filter(|r| matches!(r, FileResult::Translated { .. }))
                .count(),
            "Subtitle batch finished"
        );
        Ok(results)
    }

    async fn translate_file(
        &self,
        file: &SubtitleFile,
        source: Language,
        target: Language,
    ) -> Result<(usize, usize, String), ServiceError> {
        let entries = parse_srt(&file.content)?;
        let characters = character_count(&entries);
        let translated = translate_entries(
            self.translator.as_ref(),
            &entries,
            source,
            target,
            self.chunk_size,
        )
        .await?;
        Ok((translated.len(), characters, to_srt(&translated)))
    }

    pub fn estimate(&self, request: &EstimateRequest) -> Result<Estimate, ServiceError> {
        request.validate()?;
        let mut characters = 0;
        for file in &request.files {
            let entries = parse_srt(&file.content).map_err(|e| {
                ServiceError::InvalidInput(format!("{}: {}", file.name, e))
            })?;
            characters += character_count(&entries);
        }
        Ok(Estimate {
            characters,
            estimated_cost: (characters as f64 * self.rate_per_char).floor() as u64,
        })
    }
}
