/// Backtracking cursor over the characters of an expression.
pub struct Scanner {
    buf: Vec<char>,
    pos: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Scanner {
        Scanner{buf: source.chars().collect(), pos: 0}
    }

    pub fn pos(&self) -> usize { self.pos }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    pub fn peek(&self) -> Option<char> {
        self.buf.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.buf.get(self.pos + offset).copied()
    }

    pub fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    pub fn accept(&mut self, what: char) -> bool {
        if self.peek() == Some(what) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // after skip the scanner sits on the first char not matching `over`
    pub fn skip_while(&mut self, over: impl Fn(char) -> bool) -> bool {
        let start = self.pos;
        while self.peek().map_or(false, &over) {
            self.pos += 1;
        }
        self.pos > start
    }

    pub fn ignore_ws(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    /// Next non blank char without consuming anything.
    pub fn peek_non_ws(&self) -> Option<char> {
        self.buf[self.pos..].iter().copied().find(|c| !c.is_whitespace())
    }

    pub fn take_while(&mut self, over: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        self.skip_while(over);
        self.buf[start..self.pos].iter().collect()
    }

    /// Consumes a brace delimited block, the opening brace included, and
    /// returns its contents. None when the braces don't balance.
    pub fn braced(&mut self) -> Option<String> {
        let backtrack = self.pos;
        if !self.accept('{') {
            return None;
        }
        let mut depth = 1;
        let start = self.pos;
        while let Some(c) = self.next() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(self.buf[start..self.pos - 1].iter().collect());
                    }
                },
                _ => (),
            }
        }
        self.pos = backtrack;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::Scanner;

    #[test]
    fn scan_braces() {
        let mut s = Scanner::new("{a{b}c} rest");
        assert_eq!(s.braced(), Some("a{b}c".to_string()));
        s.ignore_ws();
        assert_eq!(s.take_while(char::is_alphabetic), "rest");
        let mut s = Scanner::new("{open");
        assert_eq!(s.braced(), None);
        assert_eq!(s.pos(), 0);
    }
}
