//! Stub files written by `stack bootstrap`, byte for byte.

pub const PROMETHEUS_YML: &str = r#"global:
  scrape_interval: 15s
  evaluation_interval: 15s

scrape_configs:
  - job_name: prometheus
    static_configs:
      - targets: ["localhost:9090"]
  - job_name: dco_agent
    metrics_path: /health
    static_configs:
      - targets: ["dco_agent:8000"]
"#;

pub const RQ_PROXY_APP: &str = r#"# pass-through proxy in front of rq-dashboard
from fastapi import FastAPI, Request, Response
import httpx
import os

app = FastAPI(title="rq-proxy")

RQ_DASH_URL = os.environ.get("RQ_DASHBOARD_URL", "http://rq_dashboard:9181")


@app.api_route("/{full_path:path}", methods=["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"])
async def proxy(full_path: str, request: Request):
    headers = dict(request.headers)
    headers.pop("host", None)
    async with httpx.AsyncClient(timeout=30.0) as client:
        resp = await client.request(
            method=request.method,
            url=f"{RQ_DASH_URL}/{full_path}",
            headers=headers,
            content=await request.body(),
            params=request.query_params,
        )
    return Response(content=resp.content, status_code=resp.status_code, headers=dict(resp.headers))
"#;

pub const HEALTH_SERVER: &str = r#"#!/usr/bin/env python3
from http.server import BaseHTTPRequestHandler, HTTPServer
import json
import os


class Handler(BaseHTTPRequestHandler):
    def do_GET(self):
        if self.path != "/health":
            self.send_response(404)
            self.end_headers()
            return
        payload = json.dumps({"status": "ok"}).encode()
        self.send_response(200)
        self.send_header("Content-Type", "application/json")
        self.send_header("Content-Length", str(len(payload)))
        self.end_headers()
        self.wfile.write(payload)

    def log_message(self, format, *args):
        return


if __name__ == "__main__":
    port = int(os.environ.get("DCO_AGENT_PORT", os.environ.get("PORT", 8000)))
    HTTPServer(("", port), Handler).serve_forever()
"#;
