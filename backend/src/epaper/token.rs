// token.rs
//
// The client echoes back the remaining shuffle plan as a comma-separated
// list of catalog indices. Nothing in it is trusted.

/// Separator between indices in the `Token` header / `token` query param.
pub const TOKEN_SEPARATOR: char = ',';

/// Decodes a raw token into the ordered plan of indices valid for a
/// catalog of `catalog_len` entries.
///
/// Pieces that are not integers, are negative, or fall outside
/// `[0, catalog_len)` are dropped silently. Order is preserved.
pub fn decode(raw: &str, catalog_len: usize) -> Vec<usize> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    raw.split(TOKEN_SEPARATOR)
        .filter_map(|piece| piece.trim().parse::<usize>().ok())
        .filter(|&idx| idx < catalog_len)
        .collect()
}

/// Encodes a plan back into its wire form. An empty plan is an empty string.
pub fn encode(plan: &[usize]) -> String {
    plan.iter()
        .map(|idx| idx.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
