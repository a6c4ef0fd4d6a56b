use clap::Args;
use eyre::Result;
use tokio::io::AsyncWriteExt;

use crate::io::{sources, Format, Input, Output};

#[derive(Args, Debug)]
pub struct Opts {
    /// Output encoding (json, csv)
    #[clap(long, env = "SIMTRACE_TO", default_value = "json")]
    pub to: String,

    /// Output file [default: stdout]
    #[clap(long, env = "SIMTRACE_OUTPUT", default_value = "stdout")]
    pub output: String,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

pub async fn encode(opts: &Opts) -> Result<()> {
    let mut output = Output::from_filename(&opts.output).await?;
    let mut encoder = Format::parse(&opts.to)?.codec();
    let mut count = 0usize;

    for source in &sources(&opts.files) {
        let mut input = Input::from_filename(source).await?;

        // Auto-detect encoding by peeking at first byte.
        let Some(format) = input.detect_format().await? else {
            continue;
        };
        let mut decoder = format.codec();

        while let Some(sample) = decoder.decode(&mut input).await? {
            encoder.encode(&mut output, &sample).await?;
            count += 1;
        }
    }

    output.flush().await?;
    tracing::info!(count, to = %opts.to, "transcoded samples");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "index,time,\"v(a,b)\"\n0,0,1\n1,0.5,2\n";

    fn opts(to: &str, input: &std::path::Path, output: &std::path::Path) -> Opts {
        Opts {
            to: to.into(),
            output: output.to_str().unwrap().into(),
            files: vec![input.to_str().unwrap().into()],
        }
    }

    #[tokio::test]
    async fn transcodes_csv_through_json_and_back() {
        let dir = tempfile::tempdir().unwrap();
        let csv_in = dir.path().join("in.csv");
        let json = dir.path().join("mid.json");
        let csv_out = dir.path().join("out.csv");
        std::fs::write(&csv_in, FEED).unwrap();

        encode(&opts("json", &csv_in, &json)).await.unwrap();
        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&json)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["data_index"], 1);
        assert_eq!(lines[1]["computed_values_for_index"][1]["name"], "v(a,b)");
        assert_eq!(lines[1]["computed_values_for_index"][0]["c_real"], 0.5);

        encode(&opts("csv", &json, &csv_out)).await.unwrap();
        assert_eq!(std::fs::read_to_string(&csv_out).unwrap(), FEED);
    }

    #[tokio::test]
    async fn unknown_encoding_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(&input, FEED).unwrap();
        let err = encode(&opts("xml", &input, &dir.path().join("out")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown encoding"));
    }
}
