//! A minimal browser page for poking at the gateway by hand: open a
//! socket with a username and topic list, send frames, watch what
//! comes back.

pub const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>sockbus</title>
<script>
window.addEventListener("load", function () {
    var output = document.getElementById("output");
    var ws;
    var print = function (message) {
        var d = document.createElement("div");
        d.textContent = message;
        output.appendChild(d);
    };
    document.getElementById("open").onclick = function () {
        if (ws) { return false; }
        var username = document.getElementById("username").value;
        var topics = document.getElementById("topics").value;
        var url = "ws://" + location.host + "/v1/socket/connect?username="
            + encodeURIComponent(username) + "&topics=" + encodeURIComponent(topics);
        ws = new WebSocket(url);
        ws.onopen = function () { print("OPEN"); };
        ws.onclose = function () { print("CLOSE"); ws = null; };
        ws.onmessage = function (evt) { print("MESSAGE: " + evt.data); };
        ws.onerror = function () { print("ERROR"); };
        return false;
    };
    document.getElementById("send").onclick = function () {
        if (!ws) { return false; }
        var body = document.getElementById("input").value;
        var topic = document.getElementById("topic").value;
        print("SEND: " + body + " to topic " + topic);
        ws.send(JSON.stringify({ body: body, topic: topic }));
        return false;
    };
    document.getElementById("close").onclick = function () {
        if (!ws) { return false; }
        ws.close();
        return false;
    };
});
</script>
</head>
<body>
<table>
<tr><td valign="top" width="50%">
<p>Open a connection, send messages to a topic, and watch delivered
messages on the right.</p>
<form>
<p><input id="username" type="text" value="alice"> username</p>
<p><input id="topics" type="text" value="sports,news"> topics</p>
<button id="open">Open</button>
<button id="close">Close</button>
<p><input id="input" type="text" value="Hello world!"></p>
<p><input id="topic" type="text" value="sports"></p>
<button id="send">Send Message</button>
</form>
</td><td valign="top" width="50%">
<div id="output"></div>
</td></tr></table>
</body>
</html>
"#;
