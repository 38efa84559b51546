use crate::config::Settings;

pub fn render_index(settings: &Settings) -> String {
    INDEX_HTML
        .replace("{{THRESHOLD}}", &settings.detector.delta_threshold.to_string())
        .replace("{{COOLDOWN}}", &settings.detector.cooldown_ms.to_string())
        .replace("{{ANNOTATION}}", &escape_html(&settings.annotation))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Shake Logger</title>
  <style>
    body {
      margin: 0;
      min-height: 100vh;
      display: grid;
      place-items: center;
      background: #f4efe6;
      color: #2b2a28;
      font-family: system-ui, sans-serif;
    }

    main {
      width: min(480px, 92vw);
      display: grid;
      gap: 16px;
    }

    #shake-status {
      padding: 28px 16px;
      border-radius: 16px;
      background: #fff;
      text-align: center;
      font-size: 1.3rem;
    }

    #shake-status.active {
      background: #ff6b4a;
      color: #fff;
    }

    #enable {
      padding: 12px;
      border: 0;
      border-radius: 12px;
      background: #2f4858;
      color: #fff;
    }

    #visits {
      margin: 0;
      padding-left: 20px;
    }

    .hint {
      margin: 0;
      color: #6b6760;
    }

    #status[data-type="error"] {
      color: #b3261e;
    }
  </style>
</head>
<body>
  <main>
    <header>
      <h1>Shake Logger</h1>
      <p class="hint">Shake the phone to log a visit.</p>
    </header>
    <div id="shake-status">Waiting...</div>
    <button id="enable" hidden>Enable shake detection</button>
    <section>
      <p class="hint">Logged this session (annotation: "{{ANNOTATION}}")</p>
      <ul id="visits"></ul>
    </section>
    <div id="status"></div>
    <p class="hint">Threshold {{THRESHOLD}}, cooldown {{COOLDOWN}} ms.</p>
  </main>

  <script>
    const shakeStatusEl = document.getElementById('shake-status');
    const statusEl = document.getElementById('status');
    const visitsEl = document.getElementById('visits');
    const enableEl = document.getElementById('enable');

    const session = (window.crypto && crypto.randomUUID)
      ? crypto.randomUUID()
      : `${Date.now()}-${Math.random().toString(16).slice(2)}`;
    let pending = [];
    let inFlight = false;

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const axis = (value) => (typeof value === 'number' ? value : null);

    const onMotion = (event) => {
      const accel = event.accelerationIncludingGravity || {};
      pending.push({
        x: axis(accel.x),
        y: axis(accel.y),
        z: axis(accel.z),
        timestamp_ms: Math.round(event.timeStamp)
      });
    };

    const showVisit = (visit) => {
      const item = document.createElement('li');
      item.textContent = `${visit.date} ${visit.time}`;
      visitsEl.prepend(item);

      shakeStatusEl.textContent = 'Logging visit...';
      shakeStatusEl.classList.add('active');
      setTimeout(() => {
        shakeStatusEl.textContent = 'Waiting...';
        shakeStatusEl.classList.remove('active');
      }, 1000);
    };

    const flush = async () => {
      if (inFlight || pending.length === 0) {
        return;
      }
      const samples = pending;
      pending = [];
      inFlight = true;
      try {
        const res = await fetch('/api/motion', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify({ session, samples })
        });
        if (!res.ok) {
          const msg = await res.text();
          throw new Error(msg || 'Request failed');
        }
        const data = await res.json();
        data.events.forEach(showVisit);
        setStatus('', '');
      } finally {
        inFlight = false;
      }
    };

    const listen = () => {
      window.addEventListener('devicemotion', onMotion);
      setInterval(() => flush().catch((err) => setStatus(err.message, 'error')), 250);
    };

    const resetSession = () => {
      pending = [];
      navigator.sendBeacon(
        '/api/motion/reset',
        new Blob([JSON.stringify({ session })], { type: 'application/json' })
      );
    };

    document.addEventListener('visibilitychange', () => {
      if (document.visibilityState === 'hidden') {
        resetSession();
      }
    });

    if (typeof DeviceMotionEvent === 'undefined') {
      setStatus('This device does not report motion data.', 'error');
    } else if (typeof DeviceMotionEvent.requestPermission === 'function') {
      enableEl.hidden = false;
      enableEl.addEventListener('click', () => {
        DeviceMotionEvent.requestPermission()
          .then((response) => {
            if (response === 'granted') {
              enableEl.hidden = true;
              listen();
            } else {
              setStatus('Motion permission is needed to detect shaking.', 'error');
            }
          })
          .catch((err) => setStatus(err.message, 'error'));
      });
    } else {
      listen();
    }
  </script>
</body>
</html>
"#;
