//! Embedded single-page UI.
//!
//! The browser is just a thin view over the v1 API; every state transition
//! happens server-side. Served as one inline document so the binary stays
//! self-contained.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Hearth — Family Wellness AI</title>
<style>
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body {
    background: #fdf8f2;
    color: #3d3229;
    font-family: Georgia, 'Times New Roman', serif;
    font-size: 1.05rem;
    height: 100vh;
    display: flex;
  }
  #sidebar {
    width: 290px;
    min-width: 290px;
    border-right: 1px solid #e8dccb;
    padding: 1.2rem;
    overflow-y: auto;
    background: #faf3e8;
  }
  #sidebar h2 { font-size: 1rem; margin: 1rem 0 0.5rem; color: #8a6d4f; }
  #main { flex: 1; display: flex; flex-direction: column; }
  #header { padding: 1rem 1.5rem 0.5rem; border-bottom: 1px solid #e8dccb; }
  #header .caption { font-size: 0.9rem; color: #8a6d4f; }
  #messages {
    flex: 1;
    overflow-y: auto;
    padding: 1.5rem;
    display: flex;
    flex-direction: column;
    gap: 1rem;
  }
  .msg { max-width: 78%; line-height: 1.6; white-space: pre-wrap; }
  .msg.assistant { align-self: flex-start; background: #f2e8d8; padding: 0.7rem 1rem; border-radius: 12px; }
  .msg.user { align-self: flex-end; background: #dcebe0; padding: 0.7rem 1rem; border-radius: 12px; }
  .msg.system { align-self: center; color: #b09a7e; font-size: 0.9rem; }
  #input-area { display: flex; padding: 1rem 1.5rem; gap: 0.8rem; border-top: 1px solid #e8dccb; }
  #prompt {
    flex: 1; border: 1px solid #d8c8b0; border-radius: 8px;
    padding: 0.6rem; font-family: inherit; font-size: 1rem; resize: none; outline: none;
    background: #fffdf9;
  }
  button {
    background: #8a6d4f; color: #fffdf9; border: none; border-radius: 8px;
    padding: 0.55rem 1rem; cursor: pointer; font-family: inherit; font-size: 0.95rem;
  }
  button:hover { background: #6f5740; }
  button:disabled { opacity: 0.4; cursor: not-allowed; }
  button.secondary { background: transparent; color: #8a6d4f; border: 1px solid #d8c8b0; }
  .persona-btn {
    display: block; width: 100%; text-align: left; margin-bottom: 0.5rem;
    background: #fffdf9; color: #3d3229; border: 1px solid #d8c8b0;
  }
  .persona-btn.active { border-color: #8a6d4f; background: #f2e8d8; }
  .persona-btn .pname { font-weight: bold; }
  .persona-btn .pdesc { font-size: 0.82rem; color: #8a6d4f; }
  select, input[type=password], input[type=range] {
    width: 100%; padding: 0.4rem; margin-bottom: 0.5rem;
    border: 1px solid #d8c8b0; border-radius: 6px; font-family: inherit; background: #fffdf9;
  }
  #gate {
    position: fixed; inset: 0; background: #fdf8f2; z-index: 10;
    display: flex; align-items: center; justify-content: center;
  }
  #gate.hidden { display: none; }
  #gate-inner { max-width: 440px; padding: 2rem; }
  #gate-inner h1 { margin-bottom: 0.8rem; }
  #gate-inner p { margin-bottom: 1rem; line-height: 1.6; color: #6f5740; }
  #gate-error { color: #a33a2a; margin-top: 0.8rem; font-size: 0.9rem; }
  .hotlines { font-size: 0.85rem; color: #6f5740; line-height: 1.7; }
  .side-actions { margin-top: 1rem; display: flex; flex-direction: column; gap: 0.5rem; }
</style>
</head>
<body>

<div id="gate">
  <div id="gate-inner">
    <h1>&#127968; Hearth</h1>
    <p>A family wellness companion powered by Google Gemini. Bring your own
       API key &mdash; it is used only for this session and never stored.</p>
    <input type="password" id="api-key" placeholder="Enter your Google API key" autocomplete="off">
    <button id="validate-btn" onclick="validateKey()">&#128640; Validate &amp; Start</button>
    <div id="gate-error"></div>
  </div>
</div>

<div id="sidebar">
  <h2>&#129302; AI Assistants</h2>
  <div id="personas"></div>

  <h2>&#128202; Quick Assessment</h2>
  <select id="age-group">
    <option>13-17</option>
    <option>18-25</option>
    <option>Parent/Guardian</option>
    <option>Other</option>
  </select>
  <select id="concern">
    <option>Mental health</option>
    <option>Academic stress</option>
    <option>Parenting</option>
    <option>Child development</option>
    <option>Family communication</option>
  </select>
  <label style="font-size:0.85rem;color:#8a6d4f">Current mood (1-10): <span id="mood-val">5</span></label>
  <input type="range" id="mood" min="1" max="10" value="5"
         oninput="document.getElementById('mood-val').textContent = this.value">
  <button class="secondary" style="width:100%" onclick="getRecommendation()">Get Recommendation</button>

  <h2>&#127384; Crisis Resources</h2>
  <div class="hotlines">
    India &mdash; Suicide Prevention: 104<br>
    KIRAN Mental Health: 1800-599-0019<br>
    Vandrevala Foundation: 9999666555<br>
    iCall: 9152987821
  </div>

  <div class="side-actions">
    <button class="secondary" onclick="clearChat()">&#128465; Clear Chat</button>
    <button class="secondary" onclick="changeKey()">&#128260; Change API Key</button>
  </div>
</div>

<div id="main">
  <div id="header">
    <h2 id="chat-title">&#128172; Chat</h2>
    <div class="caption" id="chat-caption"></div>
  </div>
  <div id="messages"></div>
  <div id="input-area">
    <textarea id="prompt" rows="1" placeholder="Type your message here..." autocomplete="off"></textarea>
    <button id="send-btn" onclick="send()">Send</button>
  </div>
</div>

<script>
let sessionId = null;
let personas = [];
let activePersona = null;

const messagesEl = document.getElementById('messages');
const promptEl = document.getElementById('prompt');
const sendBtn = document.getElementById('send-btn');

async function api(method, path, body) {
  const res = await fetch(path, {
    method,
    headers: { 'Content-Type': 'application/json' },
    body: body ? JSON.stringify(body) : undefined,
  });
  const data = await res.json().catch(() => ({}));
  if (!res.ok) throw new Error(data.error || ('HTTP ' + res.status));
  return data;
}

async function init() {
  const existing = sessionStorage.getItem('hearth_session');
  sessionId = existing || (await api('POST', '/api/v1/session')).session_id;
  sessionStorage.setItem('hearth_session', sessionId);
  personas = await api('GET', '/api/v1/personas');
  try {
    await refresh();
  } catch (e) {
    // stale session id after a server restart
    sessionStorage.removeItem('hearth_session');
    sessionId = (await api('POST', '/api/v1/session')).session_id;
    sessionStorage.setItem('hearth_session', sessionId);
    await refresh();
  }
}

function renderPersonas() {
  const holder = document.getElementById('personas');
  holder.innerHTML = '';
  for (const p of personas) {
    const btn = document.createElement('button');
    btn.className = 'persona-btn' + (activePersona && p.id === activePersona.id ? ' active' : '');
    btn.innerHTML = '<span class="pname">' + p.display_name + '</span><br><span class="pdesc">' + p.description + '</span>';
    btn.onclick = () => selectPersona(p.id);
    holder.appendChild(btn);
  }
}

function renderMessages(messages) {
  messagesEl.innerHTML = '';
  for (const m of messages) addMessage(m.role, m.content);
}

function addMessage(role, content) {
  const div = document.createElement('div');
  div.className = 'msg ' + role;
  div.textContent = content;
  messagesEl.appendChild(div);
  messagesEl.scrollTop = messagesEl.scrollHeight;
}

async function refresh() {
  const view = await api('GET', '/api/v1/session/' + sessionId + '/messages');
  activePersona = view.persona;
  document.getElementById('gate').classList.toggle('hidden', view.unlocked);
  document.getElementById('chat-title').textContent = '\u{1F4AC} Chat with ' + view.persona.display_name;
  document.getElementById('chat-caption').textContent = 'Your ' + view.persona.role_label;
  renderPersonas();
  renderMessages(view.messages);
}

async function validateKey() {
  const key = document.getElementById('api-key').value.trim();
  const errEl = document.getElementById('gate-error');
  errEl.textContent = '';
  if (!key) { errEl.textContent = 'Please enter your API key first.'; return; }
  const btn = document.getElementById('validate-btn');
  btn.disabled = true;
  btn.textContent = 'Validating...';
  try {
    await api('POST', '/api/v1/session/' + sessionId + '/credential', { api_key: key });
    document.getElementById('api-key').value = '';
    await refresh();
  } catch (e) {
    errEl.textContent = '❌ ' + e.message;
  } finally {
    btn.disabled = false;
    btn.textContent = '\u{1F680} Validate & Start';
  }
}

async function selectPersona(id) {
  await api('POST', '/api/v1/session/' + sessionId + '/persona', { persona_id: id });
  await refresh();
}

async function getRecommendation() {
  const out = await api('POST', '/api/v1/session/' + sessionId + '/recommend', {
    age_group: document.getElementById('age-group').value,
    concern: document.getElementById('concern').value,
    mood: parseInt(document.getElementById('mood').value, 10),
  });
  if (out.switched) addMessage('system', 'Switched to ' + out.persona.display_name);
  await refresh();
}

async function send() {
  const text = promptEl.value.trim();
  if (!text) return;
  promptEl.value = '';
  sendBtn.disabled = true;
  addMessage('user', text);
  addMessage('system', '...');
  try {
    const out = await api('POST', '/api/v1/session/' + sessionId + '/chat', { content: text });
    messagesEl.lastChild.remove();
    addMessage('assistant', out.reply.content);
  } catch (e) {
    messagesEl.lastChild.remove();
    addMessage('system', 'Something went wrong: ' + e.message);
  } finally {
    sendBtn.disabled = false;
    promptEl.focus();
  }
}

async function clearChat() {
  await api('POST', '/api/v1/session/' + sessionId + '/clear');
  await refresh();
}

async function changeKey() {
  await api('DELETE', '/api/v1/session/' + sessionId + '/credential');
  await refresh();
}

window.addEventListener('pagehide', (e) => {
  if (!e.persisted && sessionId) {
    fetch('/api/v1/session/' + sessionId, { method: 'DELETE', keepalive: true }).catch(() => {});
  }
});

promptEl.addEventListener('keydown', (e) => {
  if (e.key === 'Enter' && !e.shiftKey) {
    e.preventDefault();
    send();
  }
});

init();
</script>
</body>
</html>
"#;
