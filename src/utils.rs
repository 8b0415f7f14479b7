//! Shared formatting helpers for the mcmm panel core.

/// Format a megabyte value as a gigabyte string, e.g. `"2.9 GB"`.
/// Rounded to one decimal place; whole values drop the fraction (`"4 GB"`).
/// Non-positive or non-finite input renders as `"0 GB"`.
pub fn format_gb_from_mb(mb: f64) -> String {
    if !mb.is_finite() || mb <= 0.0 {
        return "0 GB".to_string();
    }
    let gb = (mb / 1024.0 * 10.0).round() / 10.0;
    if gb.fract() == 0.0 {
        format!("{} GB", gb as i64)
    } else {
        format!("{:.1} GB", gb)
    }
}

/// Format a player-count label, e.g. `"3 / 20 players"`.
/// An unknown maximum renders as `"?"`.
pub fn format_player_label(online: u32, max: Option<u32>) -> String {
    match max {
        Some(max) => format!("{} / {} players", online, max),
        None => format!("{} / ? players", online),
    }
}

/// Extract the first host port from a docker ports string, e.g.
/// `"0.0.0.0:25565->25565/tcp, :::25565->25565/tcp"` yields `"25565"`.
/// Falls back to the Minecraft default when the string is unparseable.
pub fn primary_port(ports: &str) -> String {
    let first = ports.split(',').next().unwrap_or("").trim();
    if let Some(arrow) = first.find("->") {
        let host = &first[..arrow];
        if let Some(colon) = host.rfind(':') {
            let port = &host[colon + 1..];
            if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
                return port.to_string();
            }
        }
    }
    "25565".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gb_rounds_to_one_decimal() {
        assert_eq!(format_gb_from_mb(3000.0), "2.9 GB");
        assert_eq!(format_gb_from_mb(4000.0), "3.9 GB");
        assert_eq!(format_gb_from_mb(1536.0), "1.5 GB");
    }

    #[test]
    fn test_format_gb_whole_values_drop_fraction() {
        assert_eq!(format_gb_from_mb(4096.0), "4 GB");
        assert_eq!(format_gb_from_mb(1024.0), "1 GB");
    }

    #[test]
    fn test_format_gb_non_positive() {
        assert_eq!(format_gb_from_mb(0.0), "0 GB");
        assert_eq!(format_gb_from_mb(-512.0), "0 GB");
        assert_eq!(format_gb_from_mb(f64::NAN), "0 GB");
    }

    #[test]
    fn test_format_player_label() {
        assert_eq!(format_player_label(3, Some(20)), "3 / 20 players");
        assert_eq!(format_player_label(0, None), "0 / ? players");
    }

    #[test]
    fn test_primary_port() {
        assert_eq!(primary_port("0.0.0.0:25565->25565/tcp, :::25565->25565/tcp"), "25565");
        assert_eq!(primary_port("0.0.0.0:25999->25565/tcp"), "25999");
        assert_eq!(primary_port(""), "25565");
        assert_eq!(primary_port("garbage"), "25565");
    }
}
