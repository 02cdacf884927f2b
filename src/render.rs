//src/render.rs

use std::f64::consts::PI;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

use ahash::{AHashMap, AHashSet};

use crate::error::Result;
use crate::types::{LayoutKind, NodeRecord, TaxId};

/// Consumer of a finished tree. Drawing happens in three phases driven by
/// [`render_tree`]: every edge, then every node, then `finish`, which
/// returns the produced document.
pub trait RenderAdapter {
    fn begin(&mut self, _nodes: &[NodeRecord]) -> Result<()> {
        Ok(())
    }

    fn edge(&mut self, _parent: &NodeRecord, _child: &NodeRecord) -> Result<()> {
        Ok(())
    }

    fn node(&mut self, node: &NodeRecord) -> Result<()>;

    fn finish(&mut self) -> Result<String>;
}

/// Feeds `nodes` (parents before children) through `adapter`.
pub fn render_tree<A: RenderAdapter + ?Sized>(nodes: &[NodeRecord], adapter: &mut A) -> Result<String> {
    let by_id: AHashMap<TaxId, &NodeRecord> = nodes.iter().map(|n| (n.id, n)).collect();

    adapter.begin(nodes)?;
    for child in nodes {
        if let Some(parent) = child.parent_id.and_then(|p| by_id.get(&p)) {
            adapter.edge(parent, child)?;
        }
    }
    for node in nodes {
        adapter.node(node)?;
    }
    adapter.finish()
}

/// Reads back node records written by [`JsonRecords`].
pub fn read_node_records<P: AsRef<Path>>(path: P) -> Result<Vec<NodeRecord>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Pretty-printed JSON array of node records.
#[derive(Debug, Default)]
pub struct JsonRecords {
    nodes: Vec<NodeRecord>,
}

impl RenderAdapter for JsonRecords {
    fn node(&mut self, node: &NodeRecord) -> Result<()> {
        self.nodes.push(node.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.nodes)?;
        text.push('\n');
        Ok(text)
    }
}

/// Tab-separated report, one row per node, names indented by depth.
#[derive(Debug, Default)]
pub struct TsvReport {
    output: String,
}

impl RenderAdapter for TsvReport {
    fn begin(&mut self, _nodes: &[NodeRecord]) -> Result<()> {
        self.output.clear();
        self.output
            .push_str("taxID\tparentID\trank\tvalue\tcumValue\tshare\temphasis\tx\ty\ttaxName\n");
        Ok(())
    }

    fn node(&mut self, node: &NodeRecord) -> Result<()> {
        let mut indented_name = String::new();
        for _ in 0..node.depth {
            indented_name.push_str("  ");
        }
        indented_name.push_str(&node.name);

        let parent = node.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        writeln!(
            self.output,
            "{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.2}\t{:.2}\t{}",
            node.id,
            parent,
            node.rank,
            node.raw_value,
            node.aggregated_value,
            node.share,
            node.emphasis,
            node.position.x,
            node.position.y,
            indented_name
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<String> {
        Ok(std::mem::take(&mut self.output))
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wheel zoom (0.1x to 10x, around the pointer) and drag pan. Labels
/// shrink with the square root of the zoom factor.
const ZOOM_SCRIPT: &str = r#"
(function () {
  const svg = document.querySelector("svg");
  const viewport = document.getElementById("viewport");
  const labels = viewport.querySelectorAll("text[data-size]");
  let k = 1, x = 0, y = 0, drag = null;
  function apply() {
    viewport.setAttribute("transform", `translate(${x},${y}) scale(${k})`);
    const shrink = Math.sqrt(k);
    labels.forEach(t => { t.style.fontSize = (t.dataset.size / shrink) + "px"; });
  }
  function toUser(evt) {
    const p = svg.createSVGPoint();
    p.x = evt.clientX;
    p.y = evt.clientY;
    return p.matrixTransform(svg.getScreenCTM().inverse());
  }
  svg.addEventListener("wheel", evt => {
    evt.preventDefault();
    const p = toUser(evt);
    const next = Math.min(10, Math.max(0.1, k * Math.exp(-evt.deltaY * 0.002)));
    x = p.x - (p.x - x) * next / k;
    y = p.y - (p.y - y) * next / k;
    k = next;
    apply();
  }, { passive: false });
  svg.addEventListener("pointerdown", evt => {
    const p = toUser(evt);
    drag = { x: p.x - x, y: p.y - y };
  });
  svg.addEventListener("pointermove", evt => {
    if (!drag) return;
    const p = toUser(evt);
    x = p.x - drag.x;
    y = p.y - drag.y;
    apply();
  });
  window.addEventListener("pointerup", () => { drag = null; });
})();
"#;

/// Standalone HTML page with an inline SVG of the tree. Hovering a label
/// shows its counts; wheel and drag zoom and pan. The node records are
/// embedded as JSON.
#[derive(Debug)]
pub struct HtmlDocument {
    title: String,
    layout: LayoutKind,
    margin: f64,
    edges: String,
    labels: String,
    records_json: String,
    bounds: (f64, f64, f64, f64),
    total: f64,
    internal: AHashSet<TaxId>,
}

impl HtmlDocument {
    pub fn new(title: impl Into<String>, layout: LayoutKind) -> Self {
        Self {
            title: title.into(),
            layout,
            margin: 50.0,
            edges: String::new(),
            labels: String::new(),
            records_json: String::new(),
            bounds: (0.0, 0.0, 0.0, 0.0),
            total: 0.0,
            internal: AHashSet::new(),
        }
    }

    /// Space around the drawing, also reserved for label text.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    fn edge_path(&self, parent: &NodeRecord, child: &NodeRecord) -> String {
        let (px, py) = (parent.position.x, parent.position.y);
        let (cx, cy) = (child.position.x, child.position.y);
        match self.layout {
            LayoutKind::Linear => {
                let mx = (px + cx) / 2.0;
                format!("M{px:.2},{py:.2}C{mx:.2},{py:.2} {mx:.2},{cy:.2} {cx:.2},{cy:.2}")
            }
            LayoutKind::Circular => format!("M{px:.2},{py:.2}L{cx:.2},{cy:.2}"),
        }
    }

    /// Label placement: (x offset, anchor, rotation in degrees). Leaf
    /// labels point away from their parent, internal labels toward it.
    fn label_geometry(&self, node: &NodeRecord) -> (f64, &'static str, f64) {
        let is_leaf = !self.internal.contains(&node.id);
        match (self.layout, node.angle) {
            (LayoutKind::Circular, Some(angle)) if node.parent_id.is_some() => {
                // Text on the left half is turned upright and its anchor mirrored.
                let flipped = angle > PI / 2.0 && angle < 3.0 * PI / 2.0;
                let degrees = angle.to_degrees() + if flipped { 180.0 } else { 0.0 };
                if is_leaf != flipped {
                    (6.0, "start", degrees)
                } else {
                    (-6.0, "end", degrees)
                }
            }
            _ if is_leaf => (6.0, "start", 0.0),
            _ => (-6.0, "end", 0.0),
        }
    }
}

impl RenderAdapter for HtmlDocument {
    fn begin(&mut self, nodes: &[NodeRecord]) -> Result<()> {
        self.bounds = match nodes.first() {
            Some(first) => nodes.iter().fold(
                (first.position.x, first.position.y, first.position.x, first.position.y),
                |(min_x, min_y, max_x, max_y), n| {
                    (min_x.min(n.position.x), min_y.min(n.position.y), max_x.max(n.position.x), max_y.max(n.position.y))
                },
            ),
            None => (0.0, 0.0, 0.0, 0.0),
        };
        self.internal = nodes.iter().filter_map(|n| n.parent_id).collect();
        self.total = nodes
            .iter()
            .find(|n| n.parent_id.is_none())
            .map_or(0.0, |root| root.aggregated_value);
        // "</" would close the script element early.
        self.records_json = serde_json::to_string(nodes)?.replace("</", "<\\/");
        self.edges.clear();
        self.labels.clear();
        Ok(())
    }

    fn edge(&mut self, parent: &NodeRecord, child: &NodeRecord) -> Result<()> {
        let path = self.edge_path(parent, child);
        writeln!(self.edges, "      <path d=\"{path}\"/>")?;
        Ok(())
    }

    fn node(&mut self, node: &NodeRecord) -> Result<()> {
        let (dx, anchor, rotation) = self.label_geometry(node);
        let (x, y) = (node.position.x, node.position.y);
        let fill = if self.internal.contains(&node.id) { "#555" } else { "#999" };
        let ratio = if self.total > 0.0 { node.raw_value / self.total } else { 0.0 };
        let tooltip = format!(
            "{}\nRank: {}\nTaxid: {}\nCount: {}\nRatio: {:.4}\nCumulative Count: {}\nCumulative Ratio: {:.4}",
            node.name, node.rank, node.id, node.raw_value, ratio, node.aggregated_value, node.share
        );

        writeln!(
            self.labels,
            "      <g class=\"node\" transform=\"translate({x:.2},{y:.2}) rotate({rotation:.2})\">\n        \
             <title>{}</title>\n        \
             <circle r=\"2.5\" fill=\"{fill}\"/>\n        \
             <text dy=\"0.31em\" x=\"{dx}\" text-anchor=\"{anchor}\" fill=\"{}\" data-size=\"{size:.1}\" style=\"font-size: {size:.1}px\">{}</text>\n      \
             </g>",
            escape_xml(&tooltip),
            escape_xml(&node.color),
            escape_xml(&node.name),
            size = node.font_size,
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<String> {
        let (min_x, min_y, max_x, max_y) = self.bounds;
        let m = self.margin;
        let (vx, vy) = (min_x - m, min_y - m);
        let (vw, vh) = (max_x - min_x + 2.0 * m, max_y - min_y + 2.0 * m);

        let mut html = String::new();
        write!(
            html,
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{title}</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 0; }}
    svg {{ width: 100vw; height: 100vh; }}
    .links path {{ fill: none; stroke: #555; stroke-opacity: 0.4; stroke-width: 1.5; }}
    .node text {{ font-weight: bold; paint-order: stroke; stroke: white; stroke-width: 3; }}
  </style>
</head>
<body>
  <svg viewBox="{vx:.2} {vy:.2} {vw:.2} {vh:.2}" data-layout="{layout}">
    <g id="viewport">
    <g class="links">
{edges}    </g>
    <g class="nodes">
{labels}    </g>
    </g>
  </svg>
  <script type="application/json" id="tree-data">{json}</script>
  <script>{zoom}</script>
</body>
</html>
"#,
            title = escape_xml(&self.title),
            layout = match self.layout {
                LayoutKind::Circular => "circular",
                LayoutKind::Linear => "linear",
            },
            edges = self.edges,
            labels = self.labels,
            json = self.records_json,
            zoom = ZOOM_SCRIPT,
        )?;
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point, Span};

    fn record(id: TaxId, parent_id: Option<TaxId>, depth: usize, name: &str, value: f64) -> NodeRecord {
        NodeRecord {
            id,
            name: name.to_string(),
            rank: "species".to_string(),
            parent_id,
            depth,
            raw_value: value,
            aggregated_value: value,
            share: 0.5,
            emphasis: 0.5,
            emphasis_class: 6,
            font_size: 30.0,
            color: "#FF0000".to_string(),
            position: Point { x: depth as f64 * 100.0, y: 10.0 },
            angle: None,
            radius: None,
            span: Span { start: 0.0, end: 1.0 },
        }
    }

    fn small_tree() -> Vec<NodeRecord> {
        let mut root = record(1, None, 0, "root", 0.0);
        root.aggregated_value = 8.0;
        vec![root, record(2, Some(1), 1, "A <x> & co", 4.0), record(3, Some(1), 1, "B", 4.0)]
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl RenderAdapter for Recorder {
        fn edge(&mut self, parent: &NodeRecord, child: &NodeRecord) -> Result<()> {
            self.calls.push(format!("edge {}->{}", parent.id, child.id));
            Ok(())
        }

        fn node(&mut self, node: &NodeRecord) -> Result<()> {
            self.calls.push(format!("node {}", node.id));
            Ok(())
        }

        fn finish(&mut self) -> Result<String> {
            Ok(self.calls.join(","))
        }
    }

    #[test]
    fn edges_are_drawn_before_nodes() {
        let out = render_tree(&small_tree(), &mut Recorder::default()).unwrap();
        assert_eq!(out, "edge 1->2,edge 1->3,node 1,node 2,node 3");
    }

    #[test]
    fn json_records_read_back() {
        let nodes = small_tree();
        let text = render_tree(&nodes, &mut JsonRecords::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        fs::write(&path, text).unwrap();
        assert_eq!(read_node_records(&path).unwrap(), nodes);
    }

    #[test]
    fn tsv_report_indents_by_depth() {
        let text = render_tree(&small_tree(), &mut TsvReport::default()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("taxID\tparentID"));
        assert!(lines[1].starts_with("1\t-\t"));
        assert!(lines[1].ends_with("\troot"));
        assert!(lines[3].starts_with("3\t1\tspecies\t4.0000\t4.0000"));
        assert!(lines[3].ends_with("\t  B"));
    }

    #[test]
    fn html_document_embeds_svg_and_records() {
        let nodes = small_tree();
        let mut doc = HtmlDocument::new("Sample <tree>", LayoutKind::Linear);
        let html = render_tree(&nodes, &mut doc).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Sample &lt;tree&gt;</title>"));
        assert!(html.contains("data-layout=\"linear\""));
        assert_eq!(html.matches("<path d=").count(), 2);
        assert_eq!(html.matches("<g class=\"node\"").count(), 3);
        assert!(html.contains("A &lt;x&gt; &amp; co"));
        assert!(html.contains("data-size=\"30.0\" style=\"font-size: 30.0px\""));
        assert!(html.contains("Ratio: 0.5000"));
        assert!(html.contains("id=\"tree-data\">[{"));
        assert!(html.contains("<g id=\"viewport\">"));
        assert!(html.contains("Math.sqrt(k)"));
        // viewBox spans the positions plus the margin
        assert!(html.contains("viewBox=\"-50.00 -40.00 200.00 100.00\""));
    }

    #[test]
    fn circular_labels_flip_on_the_left_half() {
        let mut doc = HtmlDocument::new("t", LayoutKind::Circular);
        let mut nodes = small_tree();
        nodes[1].angle = Some(0.25 * PI);
        nodes[2].angle = Some(PI);
        doc.begin(&nodes).unwrap();

        let (dx, anchor, degrees) = doc.label_geometry(&nodes[1]);
        assert_eq!((dx, anchor), (6.0, "start"));
        assert!((degrees - 45.0).abs() < 1e-9);
        let (dx, anchor, degrees) = doc.label_geometry(&nodes[2]);
        assert_eq!((dx, anchor), (-6.0, "end"));
        assert!((degrees - 360.0).abs() < 1e-9);
    }

    #[test]
    fn xml_escaping() {
        assert_eq!(escape_xml("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&#39;");
    }
}
