//! Replays a token stream as a typed-out animation, or renders it instantly.
//! Both paths emit the same `RenderOp` sequence; the animated path adds
//! per-token delays. The driver is cancellable so a new render can stop a
//! prior in-flight animation deterministically.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::tokens::{Token, WordStyle};

const WPM_MIN: u32 = 180;
const WPM_MAX: u32 = 240;
const JITTER_MS: i64 = 40;
const FLOOR_MS: u64 = 150;
const SENTENCE_PAUSE_MIN_MS: u64 = 2000;
const SENTENCE_PAUSE_MAX_MS: u64 = 2200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
  /// Prefix the upcoming line as a bullet item (follows a question line).
  Bullet,
  /// Visual gap between consecutive non-question lines.
  ParagraphSpacer,
  Header { text: String, community_cta: bool },
  Word { text: String, style: WordStyle },
  Link { href: String, trailing: String },
  LineBreak,
}

/// One playback step: reveal `op`, then wait `delay_ms` before the next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
  pub op: RenderOp,
  pub delay_ms: u64,
}

/// Expands tokens into render ops, resolving the pending bullet/spacer flags.
pub fn render_static(tokens: &[Token]) -> Vec<RenderOp> {
  let mut ops = Vec::new();
  let mut at_line_start = true;
  let mut pending_bullet = false;
  let mut pending_spacer = false;

  for token in tokens {
    match token {
      Token::LineBreak { after_question } => {
        ops.push(RenderOp::LineBreak);
        at_line_start = true;
        pending_bullet = *after_question;
        pending_spacer = !*after_question;
      }
      _ => {
        if at_line_start {
          if pending_bullet {
            ops.push(RenderOp::Bullet);
          } else if pending_spacer {
            ops.push(RenderOp::ParagraphSpacer);
          }
          pending_bullet = false;
          pending_spacer = false;
          at_line_start = false;
        }
        ops.push(match token {
          Token::Header { text, community_cta } => RenderOp::Header {
            text: text.clone(),
            community_cta: *community_cta,
          },
          Token::Word { text, style } => RenderOp::Word {
            text: text.clone(),
            style: style.clone(),
          },
          Token::Link { href, trailing } => RenderOp::Link {
            href: href.clone(),
            trailing: trailing.clone(),
          },
          Token::LineBreak { .. } => unreachable!(),
        });
      }
    }
  }
  ops
}

/// Pull-based animation state machine. The words-per-minute rate is rolled
/// once per animation; each step's delay gets jitter on top.
pub struct Animation {
  steps: VecDeque<(RenderOp, bool)>,
  base_delay_ms: u64,
  rng: StdRng,
}

impl Animation {
  pub fn new(tokens: &[Token]) -> Self {
    Self::with_rng(tokens, StdRng::from_entropy())
  }

  pub fn seeded(tokens: &[Token], seed: u64) -> Self {
    Self::with_rng(tokens, StdRng::seed_from_u64(seed))
  }

  fn with_rng(tokens: &[Token], mut rng: StdRng) -> Self {
    // Bullet/spacer markers are inserted by render_static; every other op
    // maps 1:1 onto a token, which carries the sentence-end flag.
    let mut flags = tokens.iter().map(Token::ends_sentence);
    let mut steps = VecDeque::new();
    for op in render_static(tokens) {
      let ends_sentence = match &op {
        RenderOp::Bullet | RenderOp::ParagraphSpacer => false,
        _ => flags.next().unwrap_or(false),
      };
      steps.push_back((op, ends_sentence));
    }
    let wpm = rng.gen_range(WPM_MIN..=WPM_MAX);
    Self {
      steps,
      base_delay_ms: 60_000 / wpm as u64,
      rng,
    }
  }

  pub fn next_step(&mut self) -> Option<Step> {
    let (op, ends_sentence) = self.steps.pop_front()?;
    let delay_ms = match &op {
      RenderOp::Bullet | RenderOp::ParagraphSpacer | RenderOp::LineBreak => 0,
      _ if ends_sentence => self.rng.gen_range(SENTENCE_PAUSE_MIN_MS..=SENTENCE_PAUSE_MAX_MS),
      _ => {
        let jitter = self.rng.gen_range(-JITTER_MS..=JITTER_MS);
        (self.base_delay_ms as i64 + jitter).max(FLOOR_MS as i64) as u64
      }
    };
    Some(Step { op, delay_ms })
  }
}

/// Drives an animation on the tokio timer, pushing each op into `sink`.
/// Cancelling the token stops playback at the next step boundary.
pub async fn play<F>(mut animation: Animation, cancel: CancellationToken, mut sink: F)
where
  F: FnMut(RenderOp),
{
  while let Some(step) = animation.next_step() {
    if cancel.is_cancelled() {
      return;
    }
    sink(step.op);
    if step.delay_ms > 0 {
      tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(Duration::from_millis(step.delay_ms)) => {}
      }
    }
  }
}
