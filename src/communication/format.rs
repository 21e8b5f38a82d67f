// DANS : src/communication/format.rs

use crate::decoders::{PoolCreationEvent, TokenInfo};

pub const DEXSCREENER_PAIR_URL: &str = "https://dexscreener.com/solana/";
pub const SOLSCAN_TX_URL: &str = "https://solscan.io/tx/";

pub fn dexscreener_link(pool_id: &str) -> String {
    format!("{}{}", DEXSCREENER_PAIR_URL, pool_id)
}

pub fn solscan_link(signature: &str) -> String {
    format!("{}{}", SOLSCAN_TX_URL, signature)
}

/// Échappement minimal exigé par le `parse_mode` HTML de Telegram.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// `AbCd…WxYz` pour un mint sans symbole connu.
pub fn short_mint(mint: &str) -> String {
    let chars: Vec<char> = mint.chars().collect();
    if chars.len() <= 10 {
        return mint.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn token_label(token: &TokenInfo) -> String {
    token.symbol.clone().unwrap_or_else(|| short_mint(&token.mint))
}

pub fn format_pool_message(event: &PoolCreationEvent) -> String {
    let mut lines = vec![
        "🆕 <b>New Raydium pool</b>".to_string(),
        String::new(),
        format!(
            "<b>Pair:</b> {}/{}",
            escape_html(&token_label(&event.token_a)),
            escape_html(&token_label(&event.token_b))
        ),
        format!("<b>Pool:</b> <code>{}</code>", escape_html(&event.pool_id)),
        format!("<b>Token A:</b> <code>{}</code>", escape_html(&event.token_a.mint)),
        format!("<b>Token B:</b> <code>{}</code>", escape_html(&event.token_b.mint)),
    ];
    if let Some(slot) = event.slot {
        lines.push(format!("<b>Slot:</b> {}", slot));
    }
    lines.push(String::new());
    lines.push(format!(
        "📈 <a href=\"{}\">DexScreener</a>",
        escape_html(&dexscreener_link(&event.pool_id))
    ));
    lines.push(format!(
        "🔍 <a href=\"{}\">Solscan</a>",
        escape_html(&solscan_link(&event.source_signature))
    ));
    lines.join("\n")
}
