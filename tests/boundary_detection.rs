use rstest::rstest;
use stream2md::{Options, compute_safe_boundary};

fn offset(buffer: &str) -> usize {
    compute_safe_boundary(buffer, &Options::default()).offset
}

#[rstest]
#[case::empty("", 0)]
#[case::partial_heading("# Hel", 0)]
#[case::complete_heading("# Hello\n", 8)]
#[case::first_paragraph_line_is_held("Hello", 0)]
#[case::complete_paragraph_line("Hello\n", 6)]
#[case::continuation_line("Hello\nwor", 8)]
#[case::trailing_space_is_held("Hello\nwor ", 8)]
#[case::ascii_letter_before_a_combining_mark("Hello\ncafe", 9)]
#[case::decomposed_letter("Hello\ncafe\u{301}", 9)]
#[case::letter_before_a_joiner("Hello\na\u{200d}", 6)]
#[case::open_strong("Hello\n**bo", 6)]
#[case::open_code_span("Hello\nsee `co", 10)]
#[case::url_prefix("Hello\nsee ht", 10)]
#[case::complete_scheme("Hello\nsee http://e", 10)]
#[case::scheme_at_line_start("Hello\nhttps://e", 6)]
#[case::scheme_then_punctuation("Hello\nsee http://.x", 10)]
#[case::finished_url("Hello\nsee http://a.b no", 22)]
#[case::lone_bracket("Hello\n[", 6)]
#[case::lone_emoji("Hello\n😀", 6)]
#[case::list_start_after_paragraph("Hello\n- ", 6)]
#[case::whitespace_only("\n\n  \n", 0)]
#[case::cut_that_would_leave_a_heading("#<u>#   <u>\n", 0)]
#[case::continuation_that_would_start_a_heading("Hello\n#x", 6)]
fn paragraphs_and_headings(#[case] buffer: &str, #[case] expected: usize) {
    assert_eq!(offset(buffer), expected, "{buffer:?}");
}

#[rstest]
#[case::open_fence("```\ncode", 0)]
#[case::open_fence_complete_line("```\ncode\n", 0)]
#[case::eager_close("```\ncode\n```", 12)]
#[case::short_close_is_content("```\ncode\n``", 0)]
#[case::closed_fence("```\ncode\n```\n", 13)]
#[case::tilde_fence_ignores_backticks("~~~\n```\n", 0)]
fn fences(#[case] buffer: &str, #[case] expected: usize) {
    assert_eq!(offset(buffer), expected, "{buffer:?}");
}

#[rstest]
#[case::possible_header("| a | b |\n", 0)]
#[case::header_and_delimiter("| a | b |\n|---|---|\n", 20)]
#[case::partial_delimiter("| a | b |\n|--", 0)]
#[case::partial_row_without_cell("| a | b |\n|---|---|\n| 1", 20)]
#[case::partial_row_with_cell("| a | b |\n|---|---|\n| 1 | 2", 25)]
#[case::complete_row("| a | b |\n|---|---|\n| 1 | 2 |\n", 30)]
fn tables(#[case] buffer: &str, #[case] expected: usize) {
    assert_eq!(offset(buffer), expected, "{buffer:?}");
}

#[rstest]
#[case::html_block_lines("<details>\n<summary>x</summary>\n", 31)]
#[case::html_block_partial_line("<details>\n<sum", 10)]
#[case::list_item_partial("- a\n- b", 4)]
#[case::list_item_complete("- a\n- b\n", 8)]
#[case::quote("> quote\n", 8)]
#[case::quote_partial("> quote\n> mo", 8)]
fn containers(#[case] buffer: &str, #[case] expected: usize) {
    assert_eq!(offset(buffer), expected, "{buffer:?}");
}

#[test]
fn settled_offset_never_passes_the_boundary() {
    for buffer in ["# A\n\nb\n\nc", "a\n\n```\nx\n", "- a\n\nb\n"] {
        let b = compute_safe_boundary(buffer, &Options::default());
        assert!(b.settled <= b.offset, "{buffer:?}: {b:?}");
    }
}

#[test]
fn boundary_is_a_char_boundary() {
    let text = "中文 *强调* 和 😀 表情\n第二行 😀👍🏽 内容\n";
    for end in (0..=text.len()).filter(|&i| text.is_char_boundary(i)) {
        let b = offset(&text[..end]);
        assert!(b <= end);
        assert!(text.is_char_boundary(b), "{end}: {b}");
    }
}
