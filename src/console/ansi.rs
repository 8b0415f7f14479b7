//! ANSI CSI 시퀀스 제거.
//!
//! 게임 서버 로그에는 색상 제어 바이트(`ESC [ ... m` 등)가 섞여 나오는데,
//! 이를 지우지 않으면 렌더링이 깨지므로 표시 전에 반드시 제거합니다.
//! 장식이 아니라 정합성 요구사항입니다.

use regex::Regex;
use std::sync::OnceLock;

/// `ESC [` + 파라미터 바이트(`0-9;`) + 최종 문자 한 개
fn csi_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1B\[[0-9;]*[A-Za-z]").expect("valid CSI pattern"))
}

/// 입력에서 모든 CSI 시퀀스를 제거한 문자열을 반환합니다.
/// 그 외 바이트는 건드리지 않으며, 두 번 적용해도 결과가 같습니다.
pub fn strip_ansi(input: &str) -> String {
    csi_pattern().replace_all(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_color_codes() {
        assert_eq!(strip_ansi("Hello\u{1b}[0mWorld"), "HelloWorld");
        assert_eq!(
            strip_ansi("\u{1b}[32m[Server]\u{1b}[0m Done (3.2s)!"),
            "[Server] Done (3.2s)!"
        );
    }

    #[test]
    fn test_strips_multi_parameter_sequences() {
        assert_eq!(strip_ansi("\u{1b}[1;31;40mwarn\u{1b}[0m"), "warn");
        assert_eq!(strip_ansi("\u{1b}[2J\u{1b}[Hcleared"), "cleared");
    }

    #[test]
    fn test_leaves_plain_text_untouched() {
        let plain = "[: 100%] ESC [ not a sequence ] \t done\n";
        assert_eq!(strip_ansi(plain), plain);
    }

    #[test]
    fn test_bare_escape_without_bracket_kept() {
        // 패턴은 `ESC [`로 시작하는 시퀀스만 제거한다
        assert_eq!(strip_ansi("a\u{1b}b"), "a\u{1b}b");
    }

    #[test]
    fn test_stripping_is_idempotent() {
        let inputs = [
            "Hello\u{1b}[0mWorld",
            "\u{1b}[1;31mred\u{1b}[0m and \u{1b}[34mblue",
            "no codes at all",
            "\u{1b}[m",
        ];
        for input in inputs {
            let once = strip_ansi(input);
            let twice = strip_ansi(&once);
            assert_eq!(once, twice, "stripping twice must equal stripping once: {:?}", input);
        }
    }
}
