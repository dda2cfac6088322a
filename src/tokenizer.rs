#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Word(String),              // Command, argument or file name
    RedirectIn,                // <
    RedirectOut,               // >
    Pipe,                      // |
    Background,                // &
}

impl TokenType {
    pub fn is_marker(&self) -> bool {
        !matches!(self, TokenType::Word(_))
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            TokenType::Word(word) => Some(word),
            _ => None,
        }
    }
}

fn is_marker_char(c: char) -> bool {
    matches!(c, '<' | '>' | '|' | '&')
}

fn tokenize_word(chars: &mut std::iter::Peekable<std::str::Chars>) -> TokenType {
    let mut word = String::new();

    while let Some(&c) = chars.peek() {
        if c == ' ' || c == '\t' || is_marker_char(c) {
            break;
        }
        word.push(c);
        chars.next();
    }
    TokenType::Word(word)
}

pub fn tokenize(input: &str) -> Vec<TokenType> {
    let mut tokens = Vec::new();
    let mut chars = input.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
                continue;
            }
            '<' => {
                chars.next();
                tokens.push(TokenType::RedirectIn);
            }
            '>' => {
                chars.next();
                tokens.push(TokenType::RedirectOut);
            }
            '|' => {
                chars.next();
                tokens.push(TokenType::Pipe);
            }
            '&' => {
                chars.next();
                tokens.push(TokenType::Background);
            }
            _ => {
                tokens.push(tokenize_word(&mut chars));
            }
        }
    }
    tokens
}

/// Words up to (and excluding) the first marker token.
pub fn leading_words(tokens: &[TokenType]) -> Vec<&str> {
    tokens.iter().map_while(TokenType::as_word).collect()
}
