//! Control page served at `/index.html` and echoed back by the zoom endpoint

pub const CONTROL_PAGE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>Camera streaming</title>
        <meta name="viewport" content="width=device-width, initial-scale=1.0">
        <style>
            .zoom {
                width: 80px;
                height: 50px;
                font-weight: bold;
            }
            .thumbnail {
                position: relative;
                width: 700px;
                height: 500px;
                overflow: hidden;
            }
            .thumbnail img {
                position: absolute;
                left: 50%;
                top: 50%;
                height: 100%;
                width: auto;
                transform: translate(-50%, -50%);
            }
        </style>
    </head>
    <body>
        <center>
            <h1>Camera Streaming</h1>

            <button type="button" class="zoom" onclick="setZoom('1')">Original</button>
            <button type="button" class="zoom" onclick="setZoom('2')">x2</button>
            <button type="button" class="zoom" onclick="setZoom('3')">x3</button>
            <button type="button" class="zoom" onclick="setZoom('4')">x4</button>
            <button type="button" class="zoom" onclick="setZoom('5')">x5</button>
            <br><br>

            <script>
                function setZoom(value) {
                    var xhr = new XMLHttpRequest();
                    xhr.open("POST", "/handle_button_click", true);
                    xhr.setRequestHeader("Content-type", "application/x-www-form-urlencoded");
                    xhr.send("button_value=" + value);
                }
            </script>
            <div class="thumbnail">
                <img src="stream.mjpg" alt="Camera stream"/>
            </div>
        </center>
    </body>
</html>
"#;
