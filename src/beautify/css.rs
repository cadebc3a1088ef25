use super::{Lines, copy_block_comment, copy_quoted};

/// One rule head or declaration per line, indented by block depth.
pub fn beautify(source: &str) -> String {
    let mut lines = Lines::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                lines.current.push(c);
                copy_quoted(&mut chars, c, &mut lines.current);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                lines.current.push_str("/*");
                copy_block_comment(&mut chars, &mut lines.current);
            }
            '{' => lines.open_brace(),
            '}' => {
                finish_declaration(&mut lines);
                lines.depth = lines.depth.saturating_sub(1);
                lines.push_line("}");
            }
            ';' => {
                lines.current.push(';');
                finish_declaration(&mut lines);
            }
            c if c.is_whitespace() => lines.space(),
            c => lines.current.push(c),
        }
    }
    lines.finish()
}

fn finish_declaration(lines: &mut Lines) {
    if lines.depth > 0 {
        lines.current = space_after_colon(lines.current.trim());
    }
    lines.flush();
}

/// `color:red` → `color: red`. Comments are left alone.
fn space_after_colon(declaration: &str) -> String {
    if declaration.starts_with("/*") {
        return declaration.to_string();
    }
    match declaration.split_once(':') {
        Some((property, value)) => format!("{}: {}", property.trim_end(), value.trim_start()),
        None => declaration.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_and_declarations() {
        assert_eq!(
            beautify("p{color:red;margin:0}a{}"),
            "p {\n    color: red;\n    margin: 0\n}\na {\n}\n"
        );
    }

    #[test]
    fn test_nested_at_rule_keeps_selector_colons() {
        assert_eq!(
            beautify("@media (max-width:600px){a:hover{color:red}}"),
            "@media (max-width:600px) {\n    a:hover {\n        color: red\n    }\n}\n"
        );
    }

    #[test]
    fn test_strings_and_comments_untouched() {
        assert_eq!(
            beautify("/* a{b} */\np::before{content:\"{;}\"}"),
            "/* a{b} */ p::before {\n    content: \"{;}\"\n}\n"
        );
    }

    #[test]
    fn test_url_value_split_on_first_colon() {
        assert_eq!(
            space_after_colon("background:url(http://x/a.png)"),
            "background: url(http://x/a.png)"
        );
    }
}
