//! Safe-context suppression.
//!
//! A match is never reportable when its position lies inside a single-line
//! comment, a block comment still open at that position, or a fenced/inline
//! code excerpt. Spans are computed once per file from the content snapshot.

/// Byte spans of the file's safe regions, in ascending start order.
#[derive(Debug)]
pub struct SafeContextIndex {
    spans: Vec<(usize, usize)>,
}

impl SafeContextIndex {
    pub fn build(content: &str) -> Self {
        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut in_block = false;
        let mut in_fence = false;
        let mut offset = 0;

        for line in content.split_inclusive('\n') {
            let line_start = offset;
            let line_end = offset + line.len();
            offset = line_end;

            // Fence markers and everything inside a fence are safe.
            if !in_block && line.trim_start().starts_with("```") {
                spans.push((line_start, line_end));
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                spans.push((line_start, line_end));
                continue;
            }

            let bytes = line.as_bytes();
            let mut i = 0;
            let mut block_open_at = if in_block { Some(0) } else { None };

            while i < bytes.len() {
                if let Some(start) = block_open_at {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        spans.push((line_start + start, line_start + i + 2));
                        block_open_at = None;
                        in_block = false;
                        i += 2;
                    } else {
                        i += 1;
                    }
                    continue;
                }
                match bytes[i] {
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        block_open_at = Some(i);
                        in_block = true;
                        i += 2;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'/') => {
                        // `://` is a URL scheme, not a comment
                        if i > 0 && bytes[i - 1] == b':' {
                            i += 2;
                        } else {
                            spans.push((line_start + i, line_end));
                            i = bytes.len();
                        }
                    }
                    b'#' => {
                        spans.push((line_start + i, line_end));
                        i = bytes.len();
                    }
                    b'`' => match line[i + 1..].find('`') {
                        Some(rel) => {
                            let end = i + 1 + rel + 1;
                            spans.push((line_start + i, line_start + end));
                            i = end;
                        }
                        None => i += 1,
                    },
                    _ => i += 1,
                }
            }

            // Block comment still open at end of line.
            if let Some(start) = block_open_at {
                spans.push((line_start + start, line_end));
            }
        }

        Self { spans }
    }

    /// True when `offset` falls inside any safe region.
    pub fn is_safe(&self, offset: usize) -> bool {
        let idx = self.spans.partition_point(|&(start, _)| start <= offset);
        idx > 0 && offset < self.spans[idx - 1].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_comment_is_safe() {
        let content = "let a = 1;\n// eval(payload)\nlet b = 2;\n";
        let idx = SafeContextIndex::build(content);
        let pos = content.find("eval").unwrap();
        assert!(idx.is_safe(pos));
        assert!(!idx.is_safe(content.find("let b").unwrap()));
    }

    #[test]
    fn hash_comment_is_safe() {
        let content = "import os\n# os.system('rm -rf /')\nprint('hi')\n";
        let idx = SafeContextIndex::build(content);
        assert!(idx.is_safe(content.find("os.system").unwrap()));
        assert!(!idx.is_safe(content.find("print").unwrap()));
    }

    #[test]
    fn unbalanced_block_comment_extends_to_eof() {
        let content = "safe();\n/* opened but never closed\neval(x)\nexec(y)\n";
        let idx = SafeContextIndex::build(content);
        assert!(!idx.is_safe(content.find("safe").unwrap()));
        assert!(idx.is_safe(content.find("eval").unwrap()));
        assert!(idx.is_safe(content.find("exec").unwrap()));
    }

    #[test]
    fn closed_block_comment_ends() {
        let content = "/* note */ eval(x)\n";
        let idx = SafeContextIndex::build(content);
        assert!(idx.is_safe(content.find("note").unwrap()));
        assert!(!idx.is_safe(content.find("eval").unwrap()));
    }

    #[test]
    fn fenced_excerpt_is_safe() {
        let content = "Usage:\n```js\neval(userInput)\n```\ndone\n";
        let idx = SafeContextIndex::build(content);
        assert!(idx.is_safe(content.find("eval").unwrap()));
        assert!(!idx.is_safe(content.find("done").unwrap()));
    }

    #[test]
    fn inline_code_is_safe() {
        let content = "call `eval(x)` to run, then eval(y)\n";
        let idx = SafeContextIndex::build(content);
        assert!(idx.is_safe(content.find("eval(x)").unwrap()));
        assert!(!idx.is_safe(content.find("eval(y)").unwrap()));
    }

    #[test]
    fn url_double_slash_is_not_a_comment() {
        let content = "const u = 'https://example.com'; eval(x)\n";
        let idx = SafeContextIndex::build(content);
        assert!(!idx.is_safe(content.find("eval").unwrap()));
    }
}
