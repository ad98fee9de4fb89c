//! Turns raw response text into a flat, ordered stream of display tokens.
//! The animation scheduler and the static renderer both replay this stream,
//! so the two paths produce identical visual structure.

const HEADER_MAX_CHARS: usize = 40;
const COMMUNITY_CTA: &str = "follow up in your community";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordStyle {
  Plain,
  Bold,
  Italic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
  /// A short standalone line rendered with heading styling. `community_cta`
  /// marks the "follow up in your community" call to action.
  Header { text: String, community_cta: bool },
  Word { text: String, style: WordStyle },
  /// Bare http/https URL; trailing punctuation is split off and rendered as
  /// plain text after the link.
  Link { href: String, trailing: String },
  /// Terminates every line. `after_question` drives bullet prefixes on the
  /// following line.
  LineBreak { after_question: bool },
}

impl Token {
  /// Whether playback should pause as if thinking after revealing this token.
  pub fn ends_sentence(&self) -> bool {
    let text = match self {
      Token::Word { text, .. } => text.as_str(),
      Token::Link { trailing, .. } => trailing.as_str(),
      _ => return false,
    };
    matches!(text.chars().last(), Some('.' | '!' | '?'))
  }
}

pub fn tokenize(text: &str) -> Vec<Token> {
  let mut tokens = Vec::new();
  for line in text.lines() {
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }
    if is_header(trimmed) {
      tokens.push(Token::Header {
        text: trimmed.to_string(),
        community_cta: is_community_cta(trimmed),
      });
      tokens.push(Token::LineBreak { after_question: false });
      continue;
    }
    for word in trimmed.split_whitespace() {
      tokens.push(inline_token(word));
    }
    tokens.push(Token::LineBreak {
      after_question: trimmed.ends_with('?'),
    });
  }
  tokens
}

fn is_header(line: &str) -> bool {
  line.chars().count() < HEADER_MAX_CHARS
    && !matches!(line.chars().last(), Some('.' | '?' | '!' | ':'))
}

fn is_community_cta(line: &str) -> bool {
  line
    .to_lowercase()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    == COMMUNITY_CTA
}

fn inline_token(word: &str) -> Token {
  if let Some(inner) = word
    .strip_prefix("**")
    .and_then(|w| w.strip_suffix("**"))
    .filter(|w| !w.is_empty())
  {
    return Token::Word {
      text: inner.to_string(),
      style: WordStyle::Bold,
    };
  }
  if let Some(inner) = word
    .strip_prefix('*')
    .and_then(|w| w.strip_suffix('*'))
    .filter(|w| !w.is_empty())
  {
    return Token::Word {
      text: inner.to_string(),
      style: WordStyle::Italic,
    };
  }
  if word.starts_with("http://") || word.starts_with("https://") {
    let split = word
      .char_indices()
      .rev()
      .take_while(|(_, c)| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | '"' | '\''))
      .last()
      .map(|(i, _)| i)
      .unwrap_or(word.len());
    if split > "https://".len() {
      return Token::Link {
        href: word[..split].to_string(),
        trailing: word[split..].to_string(),
      };
    }
  }
  Token::Word {
    text: word.to_string(),
    style: WordStyle::Plain,
  }
}
