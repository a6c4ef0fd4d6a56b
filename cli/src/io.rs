use eyre::{Result, WrapErr};
use simtrace::{Codec, CsvCodec, JsonCodec, Sample};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, BufWriter, ReadBuf,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            other => eyre::bail!("unknown encoding: {}", other),
        }
    }

    pub fn codec(self) -> SampleCodec {
        match self {
            Format::Json => SampleCodec::Json(JsonCodec),
            Format::Csv => SampleCodec::Csv(CsvCodec::new()),
        }
    }
}

/// A sample codec picked at runtime.
pub enum SampleCodec {
    Json(JsonCodec),
    Csv(CsvCodec),
}

impl SampleCodec {
    pub async fn decode<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<Sample>> {
        match self {
            SampleCodec::Json(c) => c.decode(reader).await,
            SampleCodec::Csv(c) => c.decode(reader).await,
        }
    }

    pub async fn encode<W: AsyncWrite + Unpin + Send>(
        &mut self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()> {
        match self {
            SampleCodec::Json(c) => c.encode(writer, sample).await,
            SampleCodec::Csv(c) => c.encode(writer, sample).await,
        }
    }
}

#[derive(Debug)]
pub enum Input {
    Stdin(BufReader<tokio::io::Stdin>),
    File(BufReader<File>),
}

impl Input {
    pub async fn from_filename(name: &str) -> Result<Self> {
        match name {
            "stdin" => Ok(Input::Stdin(BufReader::new(tokio::io::stdin()))),
            _ => {
                let f = File::open(name)
                    .await
                    .wrap_err_with(|| format!("opening {}", name))?;
                Ok(Input::File(BufReader::new(f)))
            }
        }
    }

    /// Peeks at the first byte to tell NDJSON from CSV. `None` on empty input.
    pub async fn detect_format(&mut self) -> Result<Option<Format>> {
        let buf = self.fill_buf().await?;
        match buf.iter().find(|b| !b.is_ascii_whitespace()) {
            None => Ok(None),
            Some(b'{') => Ok(Some(Format::Json)),
            Some(_) => Ok(Some(Format::Csv)),
        }
    }
}

impl AsyncRead for Input {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Input::Stdin(reader) => Pin::new(reader).poll_read(cx, buf),
            Input::File(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

impl AsyncBufRead for Input {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        match self.get_mut() {
            Input::Stdin(reader) => Pin::new(reader).poll_fill_buf(cx),
            Input::File(reader) => Pin::new(reader).poll_fill_buf(cx),
        }
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        match self.get_mut() {
            Input::Stdin(reader) => Pin::new(reader).consume(amt),
            Input::File(reader) => Pin::new(reader).consume(amt),
        }
    }
}

#[derive(Debug)]
pub enum Output {
    Stdout(BufWriter<tokio::io::Stdout>),
    File(BufWriter<File>),
}

impl Output {
    pub async fn from_filename(name: &str) -> Result<Self> {
        match name {
            "stdout" => Ok(Output::Stdout(BufWriter::new(tokio::io::stdout()))),
            _ => {
                let f = File::create(name)
                    .await
                    .wrap_err_with(|| format!("creating {}", name))?;
                Ok(Output::File(BufWriter::new(f)))
            }
        }
    }
}

impl AsyncWrite for Output {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        match self.get_mut() {
            Output::Stdout(writer) => Pin::new(writer).poll_write(cx, buf),
            Output::File(writer) => Pin::new(writer).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        match self.get_mut() {
            Output::Stdout(writer) => Pin::new(writer).poll_flush(cx),
            Output::File(writer) => Pin::new(writer).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        match self.get_mut() {
            Output::Stdout(writer) => Pin::new(writer).poll_shutdown(cx),
            Output::File(writer) => Pin::new(writer).poll_shutdown(cx),
        }
    }
}

pub fn sources(files: &[String]) -> Vec<String> {
    if files.is_empty() {
        vec!["stdin".to_string()]
    } else {
        files.to_vec()
    }
}

/// Reads every sample from every source, in order.
pub async fn read_samples(files: &[String]) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    for source in sources(files) {
        let mut input = Input::from_filename(&source).await?;
        let Some(format) = input.detect_format().await? else {
            tracing::debug!(source = %source, "empty input");
            continue;
        };
        let mut codec = format.codec();
        let before = samples.len();
        loop {
            let n = samples.len() - before;
            let decoded = codec
                .decode(&mut input)
                .await
                .wrap_err_with(|| format!("decoding {} (sample {})", source, n))?;
            match decoded {
                Some(sample) => samples.push(sample),
                None => break,
            }
        }
        tracing::debug!(source = %source, ?format, count = samples.len() - before, "read samples");
    }
    Ok(samples)
}
