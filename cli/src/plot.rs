use clap::Args;
use eyre::Result;
use serde_json::json;
use simtrace::{downsample_with, Schema};
use tokio::io::AsyncWriteExt;

use crate::io::{read_samples, Output};
use crate::opts::SamplingOpts;

#[derive(Args, Debug)]
pub struct Opts {
    #[clap(flatten)]
    pub sampling: SamplingOpts,

    /// Plot title [default: "<x> vs. <y1>, <y2>"]
    #[clap(long)]
    title: Option<String>,

    /// Plot X relative to the first sample
    #[clap(long)]
    relative: bool,

    /// Output file [default: stdout]
    #[clap(long, env = "SIMTRACE_OUTPUT", default_value = "stdout")]
    output: String,

    /// Input files [default: stdin]
    pub files: Vec<String>,
}

const COLORS: [&str; 8] = [
    "#E9D758", "#297373", "#A1CDF4", "#EE7860", "#593C8F", "#8FD694", "#A1674A", "#DD624E",
];

pub async fn plot(opts: &Opts) -> Result<()> {
    let samples = read_samples(&opts.files).await?;
    if samples.is_empty() {
        eyre::bail!("no data to plot");
    }

    let schema = Schema::of(&samples);
    let x = schema.resolve(&opts.sampling.x)?;
    let labels = opts.sampling.series(&schema);
    if labels.is_empty() {
        eyre::bail!("no series to plot");
    }
    let density = opts.sampling.density_for(samples.len());
    let origin = if opts.relative { x.project(&samples[0])? } else { 0.0 };

    let mut series = Vec::with_capacity(labels.len());
    for label in &labels {
        let y = schema.resolve(label)?;
        let mut points = downsample_with(&samples, density, 0, &x, &y)?;
        if opts.relative {
            points.rebase(origin);
        }
        let pairs: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
        series.push(pairs);
    }
    tracing::info!(
        samples = samples.len(),
        density,
        series = labels.len(),
        points = series.first().map(Vec::len).unwrap_or_default(),
        "plotting"
    );

    let title = opts
        .title
        .clone()
        .unwrap_or_else(|| format!("{} vs. {}", opts.sampling.x, labels.join(", ")));
    let colors: Vec<&str> = (0..labels.len()).map(|i| COLORS[i % COLORS.len()]).collect();

    let opts_json = json!({
        "title": title,
        "xLabel": opts.sampling.x,
        "labels": labels,
        "colors": colors,
    });
    let html = generate_plot_html(
        &html_escape(&title),
        &serde_json::to_string(&series)?,
        &opts_json.to_string(),
    );

    let mut output = Output::from_filename(&opts.output).await?;
    output.write_all(html.as_bytes()).await?;
    output.flush().await?;

    Ok(())
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn generate_plot_html(title: &str, series_data: &str, opts: &str) -> String {
    format!(
        r##"<!doctype html>
<html>
<head>
  <title>{title}</title>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    * {{ box-sizing: border-box; }}
    body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 20px; background: #0f1419; color: #e6edf3; }}
    .container {{ max-width: 1600px; margin: 0 auto; }}
    h1 {{ font-size: 24px; font-weight: 600; margin: 0 0 20px 0; }}
    .chart {{ background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 20px; }}
    canvas {{ width: 100%; }}
    .legend {{ display: flex; gap: 16px; margin-top: 12px; flex-wrap: wrap; font-size: 13px; }}
    .legend-item {{ display: flex; align-items: center; gap: 6px; }}
    .legend-dot {{ width: 10px; height: 10px; border-radius: 50%; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>{title}</h1>
    <div class="chart">
      <canvas id="chart" height="500"></canvas>
      <div class="legend" id="legend"></div>
    </div>
  </div>
  <script>
    const opts = {opts};
    const seriesData = {series_data};

    function draw() {{
      const canvas = document.getElementById('chart');
      const ctx = canvas.getContext('2d');
      const dpr = window.devicePixelRatio || 1;
      const rect = canvas.getBoundingClientRect();
      canvas.width = rect.width * dpr;
      canvas.height = 500 * dpr;
      ctx.scale(dpr, dpr);
      const W = rect.width;
      const H = 500;
      const pad = {{top: 20, right: 20, bottom: 50, left: 80}};
      const pw = W - pad.left - pad.right;
      const ph = H - pad.top - pad.bottom;

      ctx.clearRect(0, 0, W, H);

      let xMin = Infinity, xMax = -Infinity, yMin = Infinity, yMax = -Infinity;
      for (const series of seriesData) {{
        for (const [x, y] of series) {{
          if (x < xMin) xMin = x;
          if (x > xMax) xMax = x;
          if (y < yMin) yMin = y;
          if (y > yMax) yMax = y;
        }}
      }}
      if (!isFinite(xMin) || !isFinite(yMin)) return;

      function xToP(x) {{ return pad.left + (x - xMin) / (xMax - xMin || 1) * pw; }}
      function yToP(y) {{ return pad.top + ph - (y - yMin) / (yMax - yMin || 1) * ph; }}

      ctx.strokeStyle = '#30363d';
      ctx.lineWidth = 1;
      for (let i = 0; i <= 5; i++) {{
        const y = pad.top + (ph / 5) * i;
        ctx.beginPath(); ctx.moveTo(pad.left, y); ctx.lineTo(W - pad.right, y); ctx.stroke();
      }}

      ctx.fillStyle = '#8b949e';
      ctx.font = '11px monospace';
      ctx.textAlign = 'right';
      for (let i = 0; i <= 5; i++) {{
        const val = yMin + (1 - i / 5) * (yMax - yMin);
        ctx.fillText(formatNum(val), pad.left - 8, pad.top + (ph / 5) * i + 4);
      }}

      ctx.textAlign = 'center';
      for (let i = 0; i <= 5; i++) {{
        const val = xMin + (i / 5) * (xMax - xMin);
        ctx.fillText(formatNum(val), pad.left + (pw / 5) * i, H - pad.bottom + 20);
      }}

      ctx.font = '12px sans-serif';
      ctx.fillText(opts.xLabel, pad.left + pw / 2, H - 8);

      for (let s = 0; s < seriesData.length; s++) {{
        ctx.strokeStyle = opts.colors[s] || '#8b949e';
        ctx.lineWidth = 1.5;
        ctx.beginPath();
        seriesData[s].forEach(([x, y], i) => {{
          if (i === 0) ctx.moveTo(xToP(x), yToP(y));
          else ctx.lineTo(xToP(x), yToP(y));
        }});
        ctx.stroke();
      }}

      const legend = document.getElementById('legend');
      legend.innerHTML = '';
      for (let s = 0; s < opts.labels.length; s++) {{
        const div = document.createElement('div');
        div.className = 'legend-item';
        const dot = document.createElement('span');
        dot.className = 'legend-dot';
        dot.style.background = opts.colors[s];
        div.appendChild(dot);
        div.appendChild(document.createTextNode(opts.labels[s]));
        legend.appendChild(div);
      }}
    }}

    function formatNum(v) {{
      const a = Math.abs(v);
      if (a !== 0 && (a < 1e-3 || a >= 1e4)) return v.toExponential(2);
      return v.toFixed(3);
    }}

    draw();
    window.addEventListener('resize', draw);
  </script>
</body>
</html>"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_title_markup() {
        assert_eq!(html_escape("<V(out)> & \"I\""), "&lt;V(out)&gt; &amp; &quot;I&quot;");
    }

    #[test]
    fn html_embeds_data_and_options() {
        let html = generate_plot_html("t", "[[[0.0,1.0]]]", r#"{"labels":["V(1)"]}"#);
        assert!(html.contains("const seriesData = [[[0.0,1.0]]];"));
        assert!(html.contains(r#"const opts = {"labels":["V(1)"]};"#));
        assert!(html.contains("<title>t</title>"));
    }
}
