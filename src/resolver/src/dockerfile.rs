//! Dockerfile digest pinning.
//!
//! Rewrites `FROM <image>` and `COPY --from=<image>` lines so each mutable
//! tag reference becomes a digest-qualified one. The scan is line based: only
//! the image token is replaced, everything around it is kept. Lines whose
//! token is `scratch`, already pinned, a build stage, or not a valid
//! reference (e.g. `alpine:$(TAG)`) are passed through untouched.
//!
//! ```text
//! FROM golang:1.22 AS builder   →  FROM index.docker.io/library/golang@sha256:… AS builder
//! COPY --from=builder /app .    →  (unchanged, build stage)
//! COPY --from=nginx:1.25 /a /b  →  COPY --from=index.docker.io/library/nginx@sha256:… /a /b
//! ```

use std::collections::{HashMap, HashSet};

use a3s_pin_core::error::{PinError, Result};

use crate::digest::DigestResolver;
use crate::oci::ImageReference;

const FROM_KEYWORD: &str = "FROM";
const COPY_KEYWORD: &str = "COPY";
const FROM_FLAG: &str = "--from=";
const STAGE_ALIAS_KEYWORD: &str = "AS";
const SCRATCH: &str = "scratch";
const DIGEST_MARKER: &str = "@sha256:";

/// Image token located on a `FROM` or `COPY --from=` line.
///
/// `text` is the line the token is spliced back into: the fully trimmed line
/// for `FROM`, the original line for `COPY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

impl<'a> Candidate<'a> {
    /// The image reference token.
    pub fn image(&self) -> &'a str {
        &self.text[self.start..self.end]
    }

    /// Text following the token (e.g. ` AS builder` or ` /src /dst`).
    pub fn suffix(&self) -> &'a str {
        &self.text[self.end..]
    }

    /// Stage name declared by `AS <alias>` anywhere after the keyword.
    ///
    /// The word following the last `AS` wins, so flags such as
    /// `--platform=...` ahead of the image do not hide the alias.
    pub fn stage_alias(&self) -> Option<&'a str> {
        let words: Vec<&str> = self.text.split_whitespace().skip(1).collect();
        words
            .iter()
            .rposition(|word| word.eq_ignore_ascii_case(STAGE_ALIAS_KEYWORD))
            .and_then(|pos| words.get(pos + 1).copied())
    }

    /// The line with the token replaced by `replacement`.
    pub fn splice(&self, replacement: &str) -> String {
        let mut line = String::with_capacity(self.text.len() + replacement.len());
        line.push_str(&self.text[..self.start]);
        line.push_str(replacement);
        line.push_str(self.suffix());
        line
    }
}

/// Classification of a single Dockerfile line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `FROM <image> [AS <alias>]`
    From(Candidate<'a>),
    /// `COPY ... --from=<image> ...`
    CopyFrom(Candidate<'a>),
    /// Anything else, emitted verbatim.
    Other,
}

impl<'a> Line<'a> {
    /// Classify a line by its left-trimmed prefix.
    pub fn classify(line: &'a str) -> Self {
        let content = line.trim_start();

        let text = content.trim_end();
        if let Some(rest) = keyword_rest(text, FROM_KEYWORD) {
            let start = FROM_KEYWORD.len() + (rest.len() - rest.trim_start().len());
            return Line::From(Candidate {
                text,
                start,
                end: token_end(text, start),
            });
        }

        if keyword_rest(content, COPY_KEYWORD).is_some() {
            if let Some(pos) = line.find(FROM_FLAG) {
                let start = pos + FROM_FLAG.len();
                return Line::CopyFrom(Candidate {
                    text: line,
                    start,
                    end: token_end(line, start),
                });
            }
        }

        Line::Other
    }
}

/// Text after `keyword` when the line starts with it followed by whitespace.
fn keyword_rest<'a>(content: &'a str, keyword: &str) -> Option<&'a str> {
    content
        .strip_prefix(keyword)
        .filter(|rest| rest.starts_with(char::is_whitespace))
}

fn token_end(text: &str, start: usize) -> usize {
    text[start..]
        .find(char::is_whitespace)
        .map_or(text.len(), |offset| start + offset)
}

/// Split on `\n`; a final newline does not start another line.
///
/// A `\r` before the newline belongs to the line ending, not the line, so
/// CRLF input comes back with `\n` endings throughout.
fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    content
        .strip_suffix('\n')
        .unwrap_or(content)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Why a candidate was left alone.
#[derive(Debug)]
enum Skip {
    Scratch,
    AlreadyPinned,
    BuildStage,
    Unparseable(PinError),
}

/// Counts from one rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Lines whose image was replaced by a digest reference.
    pub pinned: usize,
    /// Lines that already carried a digest.
    pub already_pinned: usize,
    /// `scratch`, build-stage and unparseable references.
    pub skipped: usize,
}

/// Result of rewriting a Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    pub summary: RewriteSummary,
}

/// Rewrites Dockerfiles using an injected [`DigestResolver`].
pub struct DockerfilePinner<'r, R: DigestResolver + ?Sized> {
    resolver: &'r R,
    memoize: bool,
}

impl<'r, R: DigestResolver + ?Sized> DockerfilePinner<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            memoize: true,
        }
    }

    /// Resolve repeated references once per document (on by default).
    pub fn memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Pin every eligible image reference in `content`.
    ///
    /// Every output line ends with a single `\n`, whatever line ending the
    /// input used. Resolutions run in line order. The first resolver failure aborts the
    /// whole rewrite; no partial output is returned.
    pub async fn rewrite(&self, content: &str) -> Result<Rewrite> {
        let mut output = String::with_capacity(content.len());
        let mut summary = RewriteSummary::default();
        let mut stages: HashSet<String> = HashSet::new();
        let mut resolved: HashMap<&str, String> = HashMap::new();

        for (index, line) in split_lines(content).into_iter().enumerate() {
            let line_num = index + 1;
            let (candidate, declares_stage) = match Line::classify(line) {
                Line::From(candidate) => (candidate, true),
                Line::CopyFrom(candidate) => (candidate, false),
                Line::Other => {
                    output.push_str(line);
                    output.push('\n');
                    continue;
                }
            };

            let image = candidate.image();
            match check_candidate(image, &stages) {
                Ok(reference) => {
                    let pinned = match resolved.get(image) {
                        Some(pinned) => pinned.clone(),
                        None => {
                            let pinned = self
                                .resolver
                                .resolve(&reference)
                                .await
                                .map_err(|e| PinError::ResolveError {
                                    reference: image.to_string(),
                                    line: line_num,
                                    source: Box::new(e),
                                })?
                                .to_string();
                            if self.memoize {
                                resolved.insert(image, pinned.clone());
                            }
                            pinned
                        }
                    };
                    tracing::debug!(line = line_num, image, pinned = %pinned, "Pinned image reference");
                    output.push_str(&candidate.splice(&pinned));
                    summary.pinned += 1;
                }
                Err(skip) => {
                    match &skip {
                        Skip::Unparseable(e) => tracing::debug!(
                            line = line_num,
                            image,
                            error = %e,
                            "Not a valid image reference, leaving line unchanged"
                        ),
                        other => {
                            tracing::debug!(line = line_num, image, reason = ?other, "Leaving line unchanged")
                        }
                    }
                    match skip {
                        Skip::AlreadyPinned => summary.already_pinned += 1,
                        _ => summary.skipped += 1,
                    }
                    output.push_str(line);
                }
            }
            output.push('\n');

            if declares_stage {
                if let Some(alias) = candidate.stage_alias() {
                    stages.insert(alias.to_ascii_lowercase());
                }
            }
        }

        Ok(Rewrite {
            content: output,
            summary,
        })
    }
}

/// Decide whether an image token should be sent to the resolver.
fn check_candidate(image: &str, stages: &HashSet<String>) -> std::result::Result<ImageReference, Skip> {
    if image == SCRATCH {
        return Err(Skip::Scratch);
    }
    if image.contains(DIGEST_MARKER) {
        return Err(Skip::AlreadyPinned);
    }
    let is_stage_index = !image.is_empty() && image.chars().all(|c| c.is_ascii_digit());
    if is_stage_index || stages.contains(&image.to_ascii_lowercase()) {
        return Err(Skip::BuildStage);
    }
    ImageReference::parse(image).map_err(Skip::Unparseable)
}

/// Pin every eligible image reference in a Dockerfile.
pub async fn resolve_dockerfile<R: DigestResolver + ?Sized>(
    content: &str,
    resolver: &R,
) -> Result<String> {
    Ok(DockerfilePinner::new(resolver).rewrite(content).await?.content)
}
