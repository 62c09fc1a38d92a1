use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

use super::response;

const CONTROL_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>ESP32-Cam</title>
<style>
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:sans-serif;background:#1a1a2e;color:#eee;padding:20px}
.container{max-width:800px;margin:0 auto}
h1{text-align:center;color:#0df;margin:20px 0}
.card{background:rgba(255,255,255,0.1);border-radius:10px;padding:15px;margin:10px 0}
.view{text-align:center}
img{max-width:100%;border-radius:8px}
.btn{background:#0df;color:#000;border:none;padding:10px 20px;border-radius:20px;cursor:pointer;margin:5px}
.btn:hover{background:#09c}
.grid{display:grid;grid-template-columns:repeat(3,1fr);gap:10px;margin-top:10px}
.item{background:rgba(0,0,0,0.3);padding:10px;border-radius:5px;text-align:center}
.item label{color:#0df;font-size:11px}
.item .value{font-size:16px;font-weight:bold;margin-top:5px}
select,input{margin:5px;padding:4px}
</style>
</head>
<body>
<div class="container">
<h1>ESP32-Cam</h1>
<div class="card view">
<img src="/stream" id="cam" onerror="this.src='/capture'">
<div style="margin-top:10px">
<button class="btn" onclick="cam.src='/stream?'+Date.now()">Restart stream</button>
<button class="btn" onclick="cam.src='/capture?'+Date.now()">Snapshot</button>
<button class="btn" onclick="fetch('/status').then(r=>r.json()).then(d=>alert(JSON.stringify(d,null,2)))">Status</button>
</div>
</div>
<div class="card">
<select id="size"><option>320x240</option><option selected>640x480</option><option>800x600</option><option>1280x720</option></select>
<label>Quality <input id="quality" type="number" min="1" max="31" value="12"></label>
<button class="btn" onclick="fetch('/control?size='+size.value+'&quality='+quality.value)">Apply</button>
</div>
<div class="card">
<div class="grid">
<div class="item"><label>Free memory</label><div class="value" id="mem">--</div></div>
<div class="item"><label>Frames</label><div class="value" id="frames">--</div></div>
<div class="item"><label>Streams</label><div class="value" id="streams">--</div></div>
</div>
</div>
</div>
<script>
setInterval(()=>fetch('/status').then(r=>r.json()).then(d=>{
if(d.memory)mem.textContent=Math.round(d.memory.free/1024)+'KB';
if(d.server){frames.textContent=d.server.total_frames||0;streams.textContent=d.server.active_streams||0}
}).catch(()=>{}),3000);
</script>
</body>
</html>"#;

/// Compress data using gzip
pub fn gzip_compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// The control page, compressed once at startup
pub struct IndexPage {
    html: &'static str,
    gzipped: Option<Vec<u8>>,
}

impl IndexPage {
    pub fn new() -> Self {
        let gzipped = match gzip_compress(CONTROL_PAGE.as_bytes()) {
            Ok(bytes) => {
                log::debug!(
                    "[HTTP] Control page compressed {} -> {} bytes",
                    CONTROL_PAGE.len(),
                    bytes.len()
                );
                Some(bytes)
            }
            Err(e) => {
                log::warn!("[HTTP] Control page compression failed: {}", e);
                None
            }
        };
        Self {
            html: CONTROL_PAGE,
            gzipped,
        }
    }

    pub fn send<W: Write>(&self, w: &mut W, accepts_gzip: bool) -> io::Result<()> {
        const HTML: &str = "text/html; charset=UTF-8";
        match (&self.gzipped, accepts_gzip) {
            (Some(gz), true) => response::send_bytes(
                w,
                HTML,
                gz,
                &[
                    ("Content-Encoding", "gzip"),
                    ("Vary", "Accept-Encoding"),
                    ("Cache-Control", "no-cache"),
                ],
            ),
            _ => response::send_bytes(
                w,
                HTML,
                self.html.as_bytes(),
                &[("Cache-Control", "no-cache")],
            ),
        }
    }
}

impl Default for IndexPage {
    fn default() -> Self {
        Self::new()
    }
}
