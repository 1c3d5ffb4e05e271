//! JSON file store against a real temp directory.

use std::sync::Arc;

use exchange_domain::{CountriesResponse, ExchangeCountry, ExchangeCurrency};
use exchange_store::{
    ExchangeDataCache, JsonFileStore, KeyValueStore, StoreError, UserPreferences,
};

#[tokio::test]
async fn test_missing_file_opens_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = JsonFileStore::open(dir.path().join("prefs.json")).await?;

    assert_eq!(store.get("anything").await?, None);
    assert!(!store.path().exists());
    Ok(())
}

#[tokio::test]
async fn test_values_survive_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("prefs.json");

    {
        let store = JsonFileStore::open(&path).await?;
        store.put("a", "1".to_string()).await?;
        store.put("b", "2".to_string()).await?;
        store.remove("b").await?;
    }

    let reopened = JsonFileStore::open(&path).await?;
    assert_eq!(reopened.get("a").await?.as_deref(), Some("1"));
    assert_eq!(reopened.get("b").await?, None);
    assert!(!path.with_extension("tmp").exists());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_file_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, "[1, 2, 3]")?;

    let result = JsonFileStore::open(&path).await;

    assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    Ok(())
}

#[tokio::test]
async fn test_preferences_and_cache_share_one_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("prefs.json");

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&path).await?);
        let preferences = UserPreferences::new(store.clone(), "https://api.example.com");
        preferences.set_region("DE", None).await?;
        preferences.set_last_order_amount("150").await?;

        let cache = ExchangeDataCache::new(store);
        cache
            .put_countries(&CountriesResponse {
                countries: vec![ExchangeCountry {
                    code: "DE".to_string(),
                    name: "Germany".to_string(),
                    currency: ExchangeCurrency::fiat("eur", "Euro", 2),
                    regions: vec![],
                }],
                detected_country_code: Some("DE".to_string()),
                detected_region_code: None,
            })
            .await?;
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&path).await?);
    let loaded = UserPreferences::new(store.clone(), "https://api.example.com")
        .load()
        .await?;
    assert_eq!(loaded.country_code.as_deref(), Some("de"));
    assert_eq!(loaded.last_order_amount.as_deref(), Some("150"));

    let countries = ExchangeDataCache::new(store).countries().await?;
    let countries = countries.expect("countries cached");
    assert_eq!(countries.countries.len(), 1);
    assert_eq!(countries.detected_country_code.as_deref(), Some("DE"));
    Ok(())
}
