use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};

/// One named quantity computed by the simulator for a given step.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ComputedValue {
    pub name: String,
    pub c_real: f64,
    #[serde(default)]
    pub c_imag: f64,
    #[serde(default)]
    pub is_scale: bool,
    #[serde(default)]
    pub is_complex: bool,
}

// Sample is a single simulation step as emitted by the simulator feed.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub computed: i32,
    #[serde(default)]
    pub data_index: i32,
    pub computed_values_for_index: Vec<ComputedValue>,
}

impl Sample {
    /// Builds a sample from `(name, value)` pairs. The first pair is marked as
    /// the scale vector, the way the simulator reports its time axis.
    pub fn from_pairs<'a>(
        data_index: i32,
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        let computed_values_for_index: Vec<ComputedValue> = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (name, value))| ComputedValue {
                name: name.to_string(),
                c_real: value,
                c_imag: 0.0,
                is_scale: i == 0,
                is_complex: false,
            })
            .collect();
        Sample {
            computed: computed_values_for_index.len() as i32,
            data_index,
            computed_values_for_index,
        }
    }

    /// Field names in slot order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.computed_values_for_index.iter().map(|v| v.name.as_str())
    }
}

/// Read access to the named numeric fields of a raw record. Fields live in
/// numbered slots so accessors can resolve a name once and then read by
/// position.
pub trait Record {
    fn slot_of(&self, name: &str) -> Option<usize>;
    fn slot(&self, slot: usize) -> Option<(&str, f64)>;
}

impl Record for Sample {
    fn slot_of(&self, name: &str) -> Option<usize> {
        self.computed_values_for_index
            .iter()
            .position(|v| v.name == name)
    }

    fn slot(&self, slot: usize) -> Option<(&str, f64)> {
        self.computed_values_for_index
            .get(slot)
            .map(|v| (v.name.as_str(), v.c_real))
    }
}

#[async_trait]
pub trait Codec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &mut self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()>;
    /// Returns `Ok(None)` once the reader is exhausted.
    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<Sample>>;
}

/// Newline-delimited JSON, one sample per line.
pub struct JsonCodec;

#[async_trait]
impl Codec for JsonCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &mut self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()> {
        writer.write_all(&serde_json::to_vec(sample)?).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<Sample>> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(None);
            }
            if !buf.iter().all(u8::is_ascii_whitespace) {
                break;
            }
        }
        serde_json::from_slice(&buf)
            .map(Some)
            .map_err(|e| eyre::eyre!(e))
    }
}

/// Wide CSV: a header row with `index` followed by the field names, then one
/// row of real parts per sample. Imaginary parts are not carried.
#[derive(Debug, Default)]
pub struct CsvCodec {
    header: Option<Vec<String>>,
}

impl CsvCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn csv_line(record: &[String]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(record)?;
    wtr.into_inner().map_err(|e| eyre::eyre!(e.to_string()))
}

fn csv_fields(line: &[u8]) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(line);
    let record = rdr
        .records()
        .next()
        .ok_or_else(|| eyre::eyre!("no CSV record"))??;
    Ok(record.iter().map(|f| f.trim().to_string()).collect())
}

async fn read_nonblank_line<R: AsyncBufRead + Unpin + Send>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        if !buf.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(buf));
        }
    }
}

#[async_trait]
impl Codec for CsvCodec {
    async fn encode<W: AsyncWrite + Unpin + Send>(
        &mut self,
        writer: &mut W,
        sample: &Sample,
    ) -> Result<()> {
        let names: Vec<String> = sample.names().map(str::to_string).collect();
        match &self.header {
            Some(header) if *header != names => {
                eyre::bail!("sample fields {:?} do not match CSV header {:?}", names, header)
            }
            Some(_) => {}
            None => {
                let mut row = Vec::with_capacity(names.len() + 1);
                row.push("index".to_string());
                row.extend(names.iter().cloned());
                writer.write_all(&csv_line(&row)?).await?;
                self.header = Some(names);
            }
        }

        let mut row = Vec::with_capacity(sample.computed_values_for_index.len() + 1);
        row.push(sample.data_index.to_string());
        row.extend(
            sample
                .computed_values_for_index
                .iter()
                .map(|v| v.c_real.to_string()),
        );
        writer.write_all(&csv_line(&row)?).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn decode<R: AsyncBufRead + Unpin + Send>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<Sample>> {
        if self.header.is_none() {
            let Some(line) = read_nonblank_line(reader).await? else {
                return Ok(None);
            };
            let fields = csv_fields(&line)?;
            match fields.split_first() {
                Some((first, rest)) if first == "index" && !rest.is_empty() => {
                    self.header = Some(rest.to_vec());
                }
                _ => eyre::bail!("bad CSV header: {:?}", fields),
            }
        }

        let Some(line) = read_nonblank_line(reader).await? else {
            return Ok(None);
        };
        let fields = csv_fields(&line)?;
        let header = self.header.as_deref().unwrap_or_default();
        if fields.len() != header.len() + 1 {
            eyre::bail!(
                "CSV row has {} fields, header has {}",
                fields.len(),
                header.len() + 1
            );
        }

        let data_index: i32 = fields[0]
            .parse()
            .map_err(|e| eyre::eyre!("bad index {:?}: {}", fields[0], e))?;
        let mut values = Vec::with_capacity(header.len());
        for (name, raw) in header.iter().zip(&fields[1..]) {
            let value: f64 = raw
                .parse()
                .map_err(|e| eyre::eyre!("bad value {:?} for {}: {}", raw, name, e))?;
            values.push((name.as_str(), value));
        }
        Ok(Some(Sample::from_pairs(data_index, values)))
    }
}
