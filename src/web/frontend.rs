//! Embedded HTML/CSS/JS frontend for the profitlens dashboard.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies. Every chart is
//! drawn from `/api/view/{kind}` output, so the page does no arithmetic of
//! its own beyond scaling bars.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>profitlens Dashboard</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1200px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 24px; font-weight: 600; }
header h1 .logo { color: var(--accent); font-family: var(--mono); font-weight: 700; }
header .subtitle { color: var(--text-muted); font-size: 13px; }

.badge {
  display: inline-flex;
  padding: 4px 10px;
  border-radius: 12px;
  font-size: 12px;
  background: var(--surface);
  border: 1px solid var(--border);
}
.badge.ok { border-color: var(--green); color: var(--green); }
.badge.warn { border-color: var(--yellow); color: var(--yellow); }

/* Navigation */
nav {
  display: flex;
  gap: 4px;
  margin-bottom: 16px;
  background: var(--surface);
  border-radius: var(--radius);
  padding: 4px;
  border: 1px solid var(--border);
}
nav button {
  flex: 1;
  padding: 8px 16px;
  border: none;
  border-radius: 6px;
  background: transparent;
  color: var(--text-muted);
  font-size: 13px;
  cursor: pointer;
}
nav button:hover { color: var(--text); background: rgba(255,255,255,0.04); }
nav button.active { background: var(--accent); color: #fff; }

/* Filters */
.filters { display: flex; gap: 12px; flex-wrap: wrap; margin-bottom: 16px; }
.filters label { color: var(--text-muted); font-size: 12px; display: flex; flex-direction: column; gap: 4px; }
select, input {
  background: var(--bg);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: 6px;
  padding: 6px 8px;
  font-size: 13px;
}

/* KPI cards */
.kpis { display: grid; grid-template-columns: repeat(4, 1fr); gap: 12px; margin-bottom: 16px; }
.kpi { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 16px; }
.kpi .label { color: var(--text-muted); font-size: 12px; }
.kpi .value { font-size: 22px; font-weight: 600; font-family: var(--mono); }
.neg { color: var(--red); }
.pos { color: var(--green); }

/* Sections and panels */
.section h2 { font-size: 16px; margin: 20px 0 12px; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(460px, 1fr)); gap: 16px; }
.card { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 20px; }
.card h3 { font-size: 14px; font-weight: 600; margin-bottom: 12px; }

.bar-row { display: grid; grid-template-columns: 160px 1fr 110px; gap: 8px; align-items: center; margin: 3px 0; font-size: 12px; }
.bar-row .key { overflow: hidden; text-overflow: ellipsis; white-space: nowrap; color: var(--text-muted); }
.bar-track { position: relative; height: 14px; }
.bar { position: absolute; top: 0; height: 14px; border-radius: 3px; }
.bar.pos { background: var(--green); }
.bar.neg { background: var(--red); }
.bar-row .num { text-align: right; font-family: var(--mono); }

table { width: 100%; border-collapse: collapse; font-size: 12px; }
th { text-align: left; color: var(--text-muted); font-weight: 500; border-bottom: 1px solid var(--border); padding: 6px; }
td { padding: 6px; border-bottom: 1px solid rgba(48,54,61,0.5); }
td.num, th.num { text-align: right; font-family: var(--mono); }

.notice { color: var(--yellow); margin-bottom: 12px; font-size: 13px; }
.empty { color: var(--text-muted); font-style: italic; }
</style>
</head>
<body>
<div class="app">
  <header>
    <div>
      <h1><span class="logo">profitlens</span> <span id="view-title"></span></h1>
      <div class="subtitle" id="subtitle">Loading dataset…</div>
    </div>
    <span class="badge" id="health-badge">…</span>
  </header>

  <nav id="nav">
    <button data-view="tabbed" class="active">Tabbed</button>
    <button data-view="summary">Summary</button>
    <button data-view="panels">Panels</button>
  </nav>

  <div class="filters">
    <label>Segment<select id="f-segment"></select></label>
    <label>Category<select id="f-category"></select></label>
    <label>Discount level<select id="f-discount_bin"></select></label>
    <label>Drilldown scope
      <select id="f-scope">
        <option value="full">Full dataset</option>
        <option value="filtered">Filtered subset</option>
      </select>
    </label>
    <label>Top K<input type="number" id="f-top_k" min="1" max="100" value="10"></label>
  </div>

  <div class="notice" id="excluded" style="display:none"></div>

  <div class="kpis">
    <div class="kpi"><div class="label">Orders</div><div class="value" id="kpi-orders">—</div></div>
    <div class="kpi"><div class="label">Total Sales</div><div class="value" id="kpi-sales">—</div></div>
    <div class="kpi"><div class="label">Total Profit</div><div class="value" id="kpi-profit">—</div></div>
    <div class="kpi"><div class="label">Profit Margin</div><div class="value" id="kpi-margin">—</div></div>
  </div>

  <div id="sections"></div>
</div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
let currentView = 'tabbed';
const FILTERS = ['segment', 'category', 'discount_bin', 'scope', 'top_k'];

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  const data = await res.json();
  if (!res.ok) throw new Error(data.error || res.statusText);
  return data;
}

function esc(s) {
  return String(s).replace(/[&<>"']/g, c => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c]));
}

function money(n) {
  const sign = n < 0 ? '-' : '';
  return sign + '$' + Math.abs(n).toLocaleString(undefined, { minimumFractionDigits: 2, maximumFractionDigits: 2 });
}

function query() {
  const params = new URLSearchParams();
  FILTERS.forEach(name => {
    const v = document.getElementById('f-' + name).value;
    if (v !== '' && v !== 'All') params.set(name, v);
  });
  return params.toString();
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------
async function loadOptions() {
  const opts = await api('GET', '/api/options');
  fill('f-segment', opts.all, opts.segments);
  fill('f-category', opts.all, opts.categories);
  fill('f-discount_bin', opts.all, opts.discount_bins);
}

function fill(id, all, values) {
  document.getElementById(id).innerHTML = [all].concat(values)
    .map(v => `<option value="${esc(v)}">${esc(v)}</option>`).join('');
}

async function loadHealth() {
  const h = await api('GET', '/api/health');
  document.getElementById('subtitle').textContent = `${h.data_path}: ${h.record_count.toLocaleString()} orders`;
  const badge = document.getElementById('health-badge');
  badge.textContent = h.excluded_rows > 0 ? `${h.excluded_rows} excluded` : 'data ok';
  badge.className = 'badge ' + (h.excluded_rows > 0 ? 'warn' : 'ok');
}

document.getElementById('nav').addEventListener('click', e => {
  if (e.target.tagName !== 'BUTTON') return;
  document.querySelectorAll('nav button').forEach(b => b.classList.remove('active'));
  e.target.classList.add('active');
  currentView = e.target.dataset.view;
  loadView();
});

FILTERS.forEach(name => document.getElementById('f-' + name).addEventListener('change', loadView));

// ---------------------------------------------------------------------------
// View rendering
// ---------------------------------------------------------------------------
async function loadView() {
  try {
    const report = await api('GET', `/api/view/${currentView}?${query()}`);
    renderReport(report);
  } catch (e) {
    document.getElementById('sections').innerHTML = `<div class="notice">${esc(e.message)}</div>`;
  }
}

function renderReport(r) {
  document.getElementById('view-title').textContent = r.title;
  document.getElementById('kpi-orders').textContent = r.record_count.toLocaleString();
  document.getElementById('kpi-sales').textContent = money(r.kpi.total_sales);
  const profit = document.getElementById('kpi-profit');
  profit.textContent = money(r.kpi.total_profit);
  profit.className = 'value ' + (r.kpi.total_profit < 0 ? 'neg' : 'pos');
  document.getElementById('kpi-margin').textContent = r.kpi.profit_margin.toFixed(2) + '%';

  const excluded = document.getElementById('excluded');
  excluded.style.display = r.excluded_message ? 'block' : 'none';
  excluded.textContent = r.excluded_message || '';

  document.getElementById('sections').innerHTML = r.sections.map(s => `
    <div class="section">
      <h2>${esc(s.title)}</h2>
      <div class="grid">${s.panels.map(renderPanel).join('')}</div>
    </div>`).join('');
}

function renderPanel(p) {
  let body;
  switch (p.content.kind) {
    case 'aggregate': body = renderAggregate(p.id, p.content.data); break;
    case 'drilldown': body = renderDrilldown(p.content.data); break;
    case 'pivot': body = renderPivot(p.content.data); break;
    default: body = '';
  }
  return `<div class="card"><h3>${esc(p.title)}</h3>${body}</div>`;
}

function renderAggregate(id, data) {
  if (data.rows.length === 0) return '<div class="empty">No data</div>';
  const measures = data.measures;
  const value = (row, m) => typeof row.value === 'number' ? row.value : row.value[m];
  const percent = id === 'loss_rate_by_discount';
  const show = n => percent ? n.toFixed(1) + '%' : money(n);

  return measures.map(m => {
    const vals = data.rows.map(r => value(r, m));
    const max = Math.max(...vals.map(Math.abs), 1e-9);
    const hasNeg = vals.some(v => v < 0);
    const rows = data.rows.map((r, i) => {
      const v = vals[i];
      const w = Math.abs(v) / max * (hasNeg ? 50 : 100);
      const left = hasNeg ? (v < 0 ? 50 - w : 50) : 0;
      return `<div class="bar-row">
        <span class="key" title="${esc(r.key.join(' / '))}">${esc(r.key.join(' / '))}</span>
        <span class="bar-track"><span class="bar ${v < 0 ? 'neg' : 'pos'}" style="left:${left}%;width:${w}%"></span></span>
        <span class="num">${show(v)}</span>
      </div>`;
    }).join('');
    return (measures.length > 1 ? `<div class="empty">${esc(m)}</div>` : '') + rows;
  }).join('');
}

function renderDrilldown(t) {
  if (t.rows.length === 0) return '<div class="empty">No loss-making orders</div>';
  const head = t.dimensions.map(d => `<th>${esc(d)}</th>`).join('');
  const rows = t.rows.map(r => `<tr>
    ${r.key.map(k => `<td>${esc(k)}</td>`).join('')}
    <td class="num">${r.loss_order_count}</td>
    <td class="num neg">${money(r.avg_loss)}</td>
    <td class="num neg">${money(r.total_loss)}</td>
  </tr>`).join('');
  return `<table><thead><tr>${head}<th class="num">Orders</th><th class="num">Avg loss</th><th class="num">Total loss</th></tr></thead>
    <tbody>${rows}</tbody></table>`;
}

function renderPivot(p) {
  if (p.rows.length === 0) return '<div class="empty">No loss-making orders</div>';
  const min = Math.min(...p.rows.flatMap(r => r.cells), -1e-9);
  const head = p.columns.map(c => `<th class="num">${esc(c)}</th>`).join('');
  const rows = p.rows.map(r => `<tr><td>${esc(r.key.join(' / '))}</td>${r.cells.map(c => {
    const alpha = (c / min * 0.8).toFixed(2);
    return `<td class="num" style="background:rgba(248,81,73,${alpha})">${money(c)}</td>`;
  }).join('')}</tr>`).join('');
  return `<table><thead><tr><th>${esc(p.row_dimensions.join(' / '))}</th>${head}</tr></thead><tbody>${rows}</tbody></table>`;
}

// ---------------------------------------------------------------------------
// Boot
// ---------------------------------------------------------------------------
(async () => {
  try {
    await loadOptions();
    await loadHealth();
  } catch (e) {
    document.getElementById('subtitle').textContent = 'Failed to load dataset info: ' + e.message;
  }
  loadView();
})();
</script>
</body>
</html>
"##;
