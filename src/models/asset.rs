/// Numeric identifier of a tracked asset.
pub type AssetId = i64;

/// Display tag of an asset, e.g. `AST-0042`.
///
/// The backend reports its own tag in every location check; this is the
/// fallback used when no check result is available.
pub fn asset_tag(asset_id: AssetId) -> String {
    format!("AST-{:04}", asset_id)
}
