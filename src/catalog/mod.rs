// src/catalog/mod.rs
//! Catalog lookups: request signing, the signed HTTP transport and response
//! normalization.

pub mod client;
pub mod fixture;
pub mod parser;
pub mod signer;
pub mod types;

pub use client::PaApiClient;
pub use fixture::FixtureCatalog;
pub use types::{CatalogProvider, ItemBatch, ItemRecord, UNKNOWN};

/// Provider limit for ids per `GetItems` call.
pub const MAX_BATCH: usize = 10;

pub const GET_ITEMS_PATH: &str = "/paapi5/getitems";

pub const RESOURCES: &[&str] = &[
    "ItemInfo.Title",
    "Offers.Listings.Price",
    "Offers.Listings.Availability.Message",
    "Offers.Listings.Availability.Type",
    "Offers.Listings.DeliveryInfo.IsPrimeEligible",
    "Offers.Listings.SavingBasis",
];

/// Ids in provider-sized chunks, order preserved.
pub fn batches(ids: &[String]) -> Vec<Vec<String>> {
    ids.chunks(MAX_BATCH).map(|c| c.to_vec()).collect()
}

/// Appends `tag=<partner>` unless the URL already carries a tag parameter.
pub fn with_affiliate_tag(url: &str, partner_tag: Option<&str>) -> String {
    let Some(tag) = partner_tag.filter(|t| !t.is_empty()) else {
        return url.to_string();
    };
    if url.contains("?tag=") || url.contains("&tag=") {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}tag={tag}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_cap_at_ten() {
        let ids: Vec<String> = (0..23).map(|i| format!("B{i:09}")).collect();
        let b = batches(&ids);
        assert_eq!(b.iter().map(Vec::len).collect::<Vec<_>>(), vec![10, 10, 3]);
        assert_eq!(b[2][0], "B000000020");
    }

    #[test]
    fn affiliate_tag_policy() {
        let tag = Some("me-22");
        assert_eq!(
            with_affiliate_tag("https://x.jp/dp/B1", tag),
            "https://x.jp/dp/B1?tag=me-22"
        );
        assert_eq!(
            with_affiliate_tag("https://x.jp/dp/B1?th=1", tag),
            "https://x.jp/dp/B1?th=1&tag=me-22"
        );
        assert_eq!(
            with_affiliate_tag("https://x.jp/dp/B1?tag=other-22", tag),
            "https://x.jp/dp/B1?tag=other-22"
        );
        assert_eq!(
            with_affiliate_tag("https://x.jp/dp/B1?th=1&tag=other-22", tag),
            "https://x.jp/dp/B1?th=1&tag=other-22"
        );
        assert_eq!(with_affiliate_tag("https://x.jp/dp/B1", None), "https://x.jp/dp/B1");
    }
}
