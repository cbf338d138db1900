//! Terminal text sanitization.
//!
//! Commit messages and values are user-supplied and may carry escape
//! sequences that rewrite the screen, set the window title, or write to the
//! clipboard. Everything taken from the store passes through
//! [`sanitize_terminal_text`] before it is styled and written to a terminal.

use std::borrow::Cow;

const ESC: char = '\x1b';
const BEL: char = '\x07';
const C1_CSI: char = '\u{009b}';

/// Where the scanner is relative to an escape sequence.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Text,
    /// Saw ESC, deciding what kind of sequence follows.
    Escape,
    /// Skip exactly one more char (two-char designations like `ESC ( B`).
    SkipOne,
    /// CSI parameters/intermediates until a final byte.
    Csi,
    /// OSC body until BEL or ST.
    Osc,
    /// DCS/PM/APC body until ST.
    StringBody,
    /// Saw ESC inside an OSC/DCS body; a following `\` ends the sequence.
    MaybeSt,
}

fn is_stripped_control(c: char) -> bool {
    let c0 = c <= '\x1f' && !matches!(c, '\n' | '\t' | '\r');
    let c1 = ('\u{0080}'..='\u{009f}').contains(&c);
    c0 || c1 || c == '\x7f'
}

/// Strip escape sequences and control characters, keeping `\n`, `\t`, `\r`
/// and all printable text. Borrows when nothing needs removing.
#[must_use]
pub fn sanitize_terminal_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(|c| c == ESC || is_stripped_control(c)) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut state = Scan::Text;

    for c in input.chars() {
        state = match state {
            Scan::Text => match c {
                ESC => Scan::Escape,
                C1_CSI => Scan::Csi,
                c if is_stripped_control(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::Escape => match c {
                '[' => Scan::Csi,
                ']' => Scan::Osc,
                'P' | '^' | '_' => Scan::StringBody,
                '(' | ')' | '*' | '+' | '#' | ' ' => Scan::SkipOne,
                '7' | '8' | 'c' | 'D' | 'E' | 'H' | 'M' | 'N' | 'O' | 'Z' | '=' | '>' | '<' => {
                    Scan::Text
                }
                // Unknown: drop the ESC, keep the char if it is printable.
                c if is_stripped_control(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::SkipOne => Scan::Text,
            Scan::Csi => match c {
                '\x40'..='\x7e' => Scan::Text,
                '\x20'..='\x3f' => Scan::Csi,
                // Malformed sequence: resume as text.
                c if is_stripped_control(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::Osc => match c {
                BEL => Scan::Text,
                ESC => Scan::MaybeSt,
                _ => Scan::Osc,
            },
            Scan::StringBody => match c {
                ESC => Scan::MaybeSt,
                _ => Scan::StringBody,
            },
            Scan::MaybeSt => match c {
                '\\' => Scan::Text,
                ESC => Scan::MaybeSt,
                _ => Scan::StringBody,
            },
        };
    }

    Cow::Owned(out)
}
