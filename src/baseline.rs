use crate::{types::RequirementSet, utils::downloader::Downloader};

use anyhow::{Context, Result};

/// Fetch the authoritative baseline requirement list and parse it line by
/// line. Comment-only and empty lines are dropped during parsing.
pub async fn load(fetcher: &Downloader, url: &str) -> Result<RequirementSet> {
    let text = fetcher
        .fetch_text(url)
        .await
        .context(format!("Failed to fetch baseline requirements from {}", url))?;
    Ok(RequirementSet::from_lines(None, text.lines()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn load_filters_invalid_lines() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/global-requirements.txt")
            .with_status(200)
            .with_body(
                "# The global requirements list\n\
                 \n\
                 glance-store>=0.1.9\n\
                 six>=1.7 # widely used\n\
                 pbr\n",
            )
            .create_async()
            .await;

        let fetcher = Downloader::new().unwrap();
        let baseline = load(&fetcher, &format!("{}/global-requirements.txt", server.url()))
            .await
            .unwrap();

        assert_eq!(baseline.len(), 3);
        assert!(baseline.find_by_name("glance-store").is_some());
        assert!(baseline.find_by_name("six").is_some());
        assert!(baseline.find_by_name("pbr").is_some());
    }

    #[tokio::test]
    async fn load_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/global-requirements.txt")
            .with_status(500)
            .create_async()
            .await;

        let fetcher = Downloader::new().unwrap();
        let res = load(&fetcher, &format!("{}/global-requirements.txt", server.url())).await;
        assert!(res.is_err());
    }
}
