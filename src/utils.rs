use crate::error::{Error, Result};

/// Parse a comma separated ticker list such as `"AAPL, MSFT,tsla"`.
///
/// Whitespace is ignored and empty entries are dropped. Anything other than
/// ASCII letters, digits and commas rejects the whole list.
pub fn parse_tickers(content: &str) -> Result<Vec<String>> {
    let trimmed: String = content.chars().filter(|c| !c.is_whitespace()).collect();

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == ',') {
        return Err(Error::Input {
            input: trimmed,
            reason: "only letters, digits and commas are allowed",
        });
    }

    let tickers: Vec<String> = trimmed
        .split(',')
        .filter(|ticker| !ticker.is_empty())
        .map(str::to_string)
        .collect();

    if tickers.is_empty() {
        return Err(Error::Input {
            input: trimmed,
            reason: "no tickers given",
        });
    }

    Ok(tickers)
}

/// Drop repeated tickers, keeping first-seen order
pub fn unique_tickers(tickers: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        if !unique.contains(ticker) {
            unique.push(ticker.clone());
        }
    }
    unique
}
