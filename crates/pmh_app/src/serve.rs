use anyhow::{Context, Result};
use pmh_core::HarvestRequest;
use pmh_engine::DataProvider;
use pmh_logging::pmh_error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Answers one query string, writing the response as a JSON line.
pub(crate) async fn answer<W>(provider: &DataProvider, query: &str, out: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let request = HarvestRequest::from_query_string(query);
    let response = provider
        .handle(&request)
        .await
        .with_context(|| format!("could not answer {query:?}"))?;
    let mut line = serde_json::to_vec(&response)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}

/// Answers one query string per input line until the input ends. Returns
/// how many requests were answered.
pub(crate) async fn serve_lines<R, W>(
    provider: &DataProvider,
    input: R,
    out: &mut W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0;
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read request from input")?
    {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        // Keep serving after a transport failure; the next request may succeed.
        match answer(provider, query, out).await {
            Ok(()) => answered += 1,
            Err(err) => pmh_error!("Request {:?} failed: {:#}", query, err),
        }
    }
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pmh_core::{DeletedRecordPolicy, ProviderConfig, RepositoryIdentity};
    use pmh_engine::{MemoryTokenStore, SolrIndex};
    use pretty_assertions::assert_eq;

    use super::*;

    /// Provider whose index is never reached by the requests below.
    fn provider() -> DataProvider {
        pmh_logging::initialize_for_tests();
        let identity = RepositoryIdentity {
            repository_name: "Digital Library".into(),
            base_url: "https://example.org/oai".into(),
            admin_emails: Vec::new(),
            protocol_version: "2.0".into(),
            deleted_record: DeletedRecordPolicy::Persistent,
            granularity: "YYYY-MM-DDThh:mm:ssZ".into(),
        };
        let config = ProviderConfig::new(identity, "http://127.0.0.1:9/solr/none");
        let index = SolrIndex::new(&config.index).unwrap();
        let store = MemoryTokenStore::new(Duration::from_secs(60));
        DataProvider::new(Arc::new(config), Arc::new(index), Arc::new(store))
    }

    #[tokio::test]
    async fn one_json_line_per_request_and_blank_lines_skipped() {
        let input: &[u8] = b"verb=Harvest\n\n   \nverb=ListSets\n";
        let mut out = Vec::new();
        let answered = serve_lines(&provider(), input, &mut out).await.unwrap();
        assert_eq!(answered, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"badVerb\""));
        assert!(lines[1].contains("\"noSetHierarchy\""));
    }

    #[tokio::test]
    async fn empty_input_answers_nothing() {
        let mut out = Vec::new();
        let answered = serve_lines(&provider(), &b""[..], &mut out).await.unwrap();
        assert_eq!(answered, 0);
        assert!(out.is_empty());
    }
}
